pub mod status;
pub mod time_fmt;
