pub mod gate;
pub mod stop;

pub use gate::StartGate;
pub use stop::StopSignal;
