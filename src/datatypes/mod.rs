mod address;
mod cause;
mod data_coding;
pub mod gsm7;
mod numbering_plan;
mod tbcd;
pub(crate) mod timestamp;
mod type_of_number;
mod user_data;
mod validity_period;

pub use address::{Address, AddressValue, MAX_ADDRESS_LEN};
pub use cause::{CpCause, RpCause};
pub use data_coding::{CharSet, DataCoding, MessageClass, WaitingBehavior, WaitingKind};
pub use numbering_plan::NumberingPlan;
pub use tbcd::TbcdString;
pub use timestamp::Timestamp;
pub use type_of_number::TypeOfNumber;
pub use user_data::{InformationElement, MAX_COMMAND_DATA_LEN, MAX_USER_DATA_LEN, UserData};
pub use validity_period::{
    EnhancedFormat, EnhancedValidity, ValidityPeriod, relative_duration, relative_value,
};
