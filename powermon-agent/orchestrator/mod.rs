mod collector;

pub use collector::SamplerSession;
