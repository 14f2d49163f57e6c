mod changed;
mod trigger;
mod update;

pub use changed::changed;
pub use trigger::trigger;
pub use update::update;
