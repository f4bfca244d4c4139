pub mod figment;
pub mod sensitive;
pub mod validation;

pub use self::sensitive::Sensitive;
