mod impl_;
pub use impl_::*;
