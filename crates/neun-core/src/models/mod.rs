//! Built-in neuron models

pub mod hindmarsh_rose;
pub mod hodgkin_huxley;
pub mod izhikevich;

pub use hindmarsh_rose::HindmarshRoseModel;
pub use hodgkin_huxley::HodgkinHuxleyModel;
pub use izhikevich::IzhikevichModel;
