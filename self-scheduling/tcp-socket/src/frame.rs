use crate::transport_error::TransportError;
use bytes::Bytes;
use self_scheduling_core::WorkerId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// First frame on every connection: the worker's identity and the kernel it
/// must apply, which carries any shared read-only input
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SetupFrame<K> {
    pub worker: WorkerId,
    pub kernel: K,
}

pub fn encode<T: Serialize>(value: &T) -> Result<Bytes, TransportError> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TransportError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use self_scheduling_core::{DispatchMessage, MatVecKernel, WorkItem};

    #[test]
    fn test_setup_frame_carries_broadcast_vector() {
        let frame = SetupFrame {
            worker: 3,
            kernel: MatVecKernel {
                b: vec![0.0, 1.0, 2.0],
            },
        };

        let decoded: SetupFrame<MatVecKernel> = decode(&encode(&frame).unwrap()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn test_work_frame_is_not_a_setup_frame() {
        let message: DispatchMessage<Vec<f64>> = DispatchMessage::Work(WorkItem {
            id: 0,
            payload: vec![1.0],
        });
        let bytes = encode(&message).unwrap();

        assert!(decode::<SetupFrame<MatVecKernel>>(&bytes).is_err());
    }
}
