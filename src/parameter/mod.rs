mod channel;
mod value;


pub use channel::{IsoShutterChannel, ManualOutcome, ParameterChannel};
pub use value::{Bounds, ControlParameter, ControlValue, IntegerValue, RealValue, Unit};
