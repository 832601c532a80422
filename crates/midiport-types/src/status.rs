use crate::errors::EndpointError;

// CoreMIDI error codes that mean the referenced object is gone or unusable
pub const STATUS_NO_ERROR: i32 = 0;
pub const STATUS_INVALID_CLIENT: i32 = -10830;
pub const STATUS_INVALID_PORT: i32 = -10831;
pub const STATUS_WRONG_ENDPOINT_TYPE: i32 = -10832;
pub const STATUS_OBJECT_NOT_FOUND: i32 = -10842;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeStatus(pub i32);

impl NativeStatus {
    pub const OK: NativeStatus = NativeStatus(STATUS_NO_ERROR);

    pub fn is_ok(self) -> bool {
        self.0 == STATUS_NO_ERROR
    }

    pub fn check(self) -> Result<(), EndpointError> {
        match self.0 {
            STATUS_NO_ERROR => Ok(()),
            STATUS_INVALID_CLIENT
            | STATUS_INVALID_PORT
            | STATUS_WRONG_ENDPOINT_TYPE
            | STATUS_OBJECT_NOT_FOUND => Err(EndpointError::InvalidHandle),
            code => Err(EndpointError::NativeCallFailed { code }),
        }
    }
}
