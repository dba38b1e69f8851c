use crate::config::EngineConfig;
use crate::engine::JitEngine;

pub use crate::prelude::{box_class, counter_class, node_class, pair_class, stack_class};

pub fn engine() -> JitEngine {
    engine_with(EngineConfig::default())
}

pub fn engine_with(config: EngineConfig) -> JitEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    JitEngine::new(config)
}
