use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use crate::recognition::domain::engine_loader::{EngineKey, EngineLoadError, EngineLoader};
use crate::recognition::domain::speech_recognizer::SpeechRecognizer;

/// Process-wide cache of loaded engines keyed by model and device.
///
/// Each key has its own slot lock: the first caller for a key loads while
/// later callers for the same key block and then reuse the result. Different
/// keys load independently. Failed loads leave the slot empty so a later run
/// may try again.
pub struct EngineCache {
    loader: Box<dyn EngineLoader>,
    slots: Mutex<HashMap<EngineKey, Arc<EngineSlot>>>,
}

struct EngineSlot {
    engine: Mutex<Option<Arc<dyn SpeechRecognizer>>>,
}

impl EngineCache {
    pub fn new(loader: Box<dyn EngineLoader>) -> Arc<Self> {
        Arc::new(Self {
            loader,
            slots: Mutex::new(HashMap::new()),
        })
    }

    /// Return the engine for `key`, loading it on first use.
    pub fn get(&self, key: EngineKey) -> Result<Arc<dyn SpeechRecognizer>, EngineLoadError> {
        let slot = self.slot(key);
        let mut engine = slot.engine.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref loaded) = *engine {
            log::debug!("Reusing cached engine {key}");
            return Ok(loaded.clone());
        }

        log::info!("Loading engine {key} (first load may download weights)");
        let started = Instant::now();
        let loaded = self.loader.load(key)?;
        log::info!(
            "Engine {key} ready in {:.1}s",
            started.elapsed().as_secs_f64()
        );
        *engine = Some(loaded.clone());
        Ok(loaded)
    }

    pub fn is_loaded(&self, key: EngineKey) -> bool {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(&key)
            .map(|slot| {
                slot.engine
                    .try_lock()
                    .map(|engine| engine.is_some())
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    fn slot(&self, key: EngineKey) -> Arc<EngineSlot> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(key)
            .or_insert_with(|| {
                Arc::new(EngineSlot {
                    engine: Mutex::new(None),
                })
            })
            .clone()
    }
}
