pub mod bootstrap;
pub mod deploy;
pub mod destroy;
pub mod diff;
pub mod outputs;
pub mod synth;
pub mod validate;
