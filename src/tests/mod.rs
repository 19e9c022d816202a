
pub(crate) use cases::*;
