pub mod otp_code;
pub mod phone_number;
pub mod stored_handle;

pub use otp_code::{OtpCode, OTP_LENGTH};
pub use phone_number::{format, hash_phone_number, validate, PhoneNumber, DEFAULT_CALLING_CODE};
pub use stored_handle::StoredHandle;
