//! Process-wide ownership of the audio engine.
//!
//! Only one session may tap the microphone and write a recording at a time.
//! A session holds an [`EngineLease`] for as long as it records; dropping
//! the lease hands the engine back.

use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::error::RecordError;

static ENGINE_OWNER: Mutex<Option<Uuid>> = parking_lot::const_mutex(None);

#[derive(Debug)]
pub struct EngineLease {
    owner: Uuid,
}

impl EngineLease {
    /// Claim the engine for `owner`. Fails with `EngineBusy` while another
    /// owner holds it.
    pub fn acquire(owner: Uuid) -> Result<Self, RecordError> {
        let mut current = ENGINE_OWNER.lock();
        match *current {
            Some(holder) if holder != owner => Err(RecordError::EngineBusy),
            Some(_) => Err(RecordError::AlreadyRecording),
            None => {
                *current = Some(owner);
                log::debug!("engine leased to session {}", owner);
                Ok(Self { owner })
            }
        }
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }
}

impl Drop for EngineLease {
    fn drop(&mut self) {
        let mut current = ENGINE_OWNER.lock();
        if *current == Some(self.owner) {
            *current = None;
            log::debug!("engine released by session {}", self.owner);
        }
    }
}

/// Session currently holding the engine, if any.
pub fn active_owner() -> Option<Uuid> {
    *ENGINE_OWNER.lock()
}
