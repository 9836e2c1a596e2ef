pub mod data_kind;
pub mod months;
pub mod period;
