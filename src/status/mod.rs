// Status domain: sensor availability and the observable status string.

pub mod monitor;
pub mod observable;
