//! Save-state session lifecycle.
//!
//! One [`SessionController`] mediates between one emulator instance and
//! the backend save store for a single `(system, rom)` key, from page
//! entry to page teardown. The store and the emulator sit behind trait
//! seams so the state machine compiles and tests on native targets
//! without a browser.

use crate::error::{EmulatorError, StoreError};

/// Opaque emulator save-state snapshot. At most one authoritative blob
/// exists per key on the backend; a later write supersedes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveBlob(Vec<u8>);

impl SaveBlob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for SaveBlob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// Save-store address of one play session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SaveKey {
    system: String,
    rom: String,
}

impl SaveKey {
    /// `rom` is the ROM file stem (see [`crate::catalog::rom_stem`]), not
    /// the full file name.
    pub fn new(system: impl Into<String>, rom: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            rom: rom.into(),
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn rom(&self) -> &str {
        &self.rom
    }
}

/// Backend save storage for one key, last write wins.
#[allow(async_fn_in_trait)]
pub trait SaveStore {
    /// Read the save for `key`. A missing save is `Ok(None)`, not an
    /// error.
    async fn fetch(&self, key: &SaveKey) -> Result<Option<SaveBlob>, StoreError>;

    /// Write the save for `key`, replacing any previous one.
    async fn put(&self, key: &SaveKey, blob: &SaveBlob) -> Result<(), StoreError>;

    /// Fire-and-forget write that must be able to complete after the page
    /// starts unloading. Returns whether the write was handed to the
    /// transport; delivery is never confirmed.
    fn put_detached(&self, key: &SaveKey, blob: &SaveBlob) -> bool;
}

/// Result of asking the emulator for its current save data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    Data(SaveBlob),
    /// Emulator not initialized yet.
    Unavailable,
    /// Emulator running but with nothing to persist.
    Empty,
}

/// The only contract with the emulator collaborator.
pub trait EmulatorCapability {
    /// Whether the capability is currently callable.
    fn is_ready(&self) -> bool;

    fn capture_save(&self) -> Capture;

    fn restore_save(&mut self, blob: &SaveBlob) -> Result<(), EmulatorError>;
}

/// Lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    /// Entry load in flight.
    Loading,
    Ready,
    /// Save write in flight.
    Saving,
    /// Manual restore in flight.
    Restoring,
    Terminated,
}

/// Outcome of the entry load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// A save exists; the caller must hand it to the emulator before the
    /// first frame runs.
    Restore(SaveBlob),
    /// No save exists (or the read failed); start clean.
    Fresh,
}

/// User-facing outcome of a manual save or load.
///
/// Variants are deliberately distinct: "nothing to save" and "no save
/// exists" need different feedback than a failed write or read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Saved,
    SaveFailed,
    /// Emulator ready but reported no data; no write was issued.
    NothingToSave,
    /// Emulator capability not callable yet.
    NotReady,
    Loaded,
    /// No save exists on the backend.
    NoSave,
    LoadFailed,
    /// Another operation is in flight or the session is over; first
    /// request wins, later requests are rejected.
    Busy,
}

/// State machine for one play session's save data.
pub struct SessionController<S, E> {
    key: SaveKey,
    store: S,
    emulator: E,
    state: SessionState,
}

impl<S: SaveStore, E: EmulatorCapability> SessionController<S, E> {
    pub fn new(key: SaveKey, store: S, emulator: E) -> Self {
        Self {
            key,
            store,
            emulator,
            state: SessionState::Uninitialized,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn key(&self) -> &SaveKey {
        &self.key
    }

    /// Entry load. Must complete before the emulator begins executing;
    /// a restore into a running core risks corrupting its state.
    ///
    /// A missing save is the expected fresh-start path. A transport
    /// failure here also starts fresh: the session is still playable, the
    /// user just does not get their old save.
    pub async fn start(&mut self) -> EntryOutcome {
        if self.state != SessionState::Uninitialized {
            log::warn!(
                "session {}/{} already started",
                self.key.system,
                self.key.rom
            );
            return EntryOutcome::Fresh;
        }
        self.state = SessionState::Loading;

        let outcome = match self.store.fetch(&self.key).await {
            Ok(Some(blob)) => {
                log::info!(
                    "restoring save for {}/{} ({} bytes)",
                    self.key.system,
                    self.key.rom,
                    blob.len()
                );
                EntryOutcome::Restore(blob)
            }
            Ok(None) => {
                log::info!("no save for {}/{}, starting fresh", self.key.system, self.key.rom);
                EntryOutcome::Fresh
            }
            Err(err) => {
                log::warn!(
                    "entry save load failed for {}/{}: {err}",
                    self.key.system,
                    self.key.rom
                );
                EntryOutcome::Fresh
            }
        };

        self.state = SessionState::Ready;
        outcome
    }

    /// Manual save. Captures the emulator's current save data and writes
    /// it to the store. At most one operation runs at a time; requests
    /// made while one is in flight are rejected as [`Feedback::Busy`].
    pub async fn save(&mut self) -> Feedback {
        if self.state != SessionState::Ready {
            return Feedback::Busy;
        }
        if !self.emulator.is_ready() {
            return Feedback::NotReady;
        }
        let blob = match self.emulator.capture_save() {
            Capture::Data(blob) => blob,
            Capture::Unavailable => return Feedback::NotReady,
            Capture::Empty => return Feedback::NothingToSave,
        };

        self.state = SessionState::Saving;
        let feedback = match self.store.put(&self.key, &blob).await {
            Ok(()) => {
                log::info!(
                    "saved {}/{} ({} bytes)",
                    self.key.system,
                    self.key.rom,
                    blob.len()
                );
                Feedback::Saved
            }
            Err(err) => {
                log::error!("save failed for {}/{}: {err}", self.key.system, self.key.rom);
                Feedback::SaveFailed
            }
        };
        self.state = SessionState::Ready;
        feedback
    }

    /// Manual load. Reads the store and hands the blob to the emulator.
    /// "No save exists" is a distinct outcome from a transport failure.
    pub async fn load(&mut self) -> Feedback {
        if self.state != SessionState::Ready {
            return Feedback::Busy;
        }

        self.state = SessionState::Restoring;
        let feedback = match self.store.fetch(&self.key).await {
            Ok(None) => Feedback::NoSave,
            Err(err) => {
                log::error!("load failed for {}/{}: {err}", self.key.system, self.key.rom);
                Feedback::LoadFailed
            }
            Ok(Some(blob)) => {
                if !self.emulator.is_ready() {
                    Feedback::NotReady
                } else {
                    match self.emulator.restore_save(&blob) {
                        Ok(()) => {
                            log::info!(
                                "loaded {}/{} ({} bytes)",
                                self.key.system,
                                self.key.rom,
                                blob.len()
                            );
                            Feedback::Loaded
                        }
                        Err(err) => {
                            log::error!(
                                "restore failed for {}/{}: {err}",
                                self.key.system,
                                self.key.rom
                            );
                            Feedback::LoadFailed
                        }
                    }
                }
            }
        };
        self.state = SessionState::Ready;
        feedback
    }

    /// Best-effort teardown save. Captures current save data if the
    /// emulator has any and hands it to the detached transport; there is
    /// no user left to notify and no retry once the page is gone, so all
    /// failures are swallowed. Idempotent.
    ///
    /// Returns whether a write was attempted.
    pub fn teardown(&mut self) -> bool {
        if self.state == SessionState::Terminated {
            return false;
        }
        self.state = SessionState::Terminated;

        if !self.emulator.is_ready() {
            return false;
        }
        match self.emulator.capture_save() {
            Capture::Data(blob) => {
                let sent = self.store.put_detached(&self.key, &blob);
                if !sent {
                    log::warn!(
                        "teardown save for {}/{} not handed off",
                        self.key.system,
                        self.key.rom
                    );
                }
                true
            }
            Capture::Unavailable | Capture::Empty => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum StoreCall {
        Fetch,
        Put(Vec<u8>),
        PutDetached(Vec<u8>),
    }

    struct MockStore {
        fetch_result: Result<Option<SaveBlob>, StoreError>,
        put_result: Result<(), StoreError>,
        calls: RefCell<Vec<StoreCall>>,
    }

    impl MockStore {
        fn empty() -> Self {
            Self {
                fetch_result: Ok(None),
                put_result: Ok(()),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn with_blob(bytes: &[u8]) -> Self {
            Self {
                fetch_result: Ok(Some(SaveBlob::new(bytes.to_vec()))),
                ..Self::empty()
            }
        }

        fn failing(err: StoreError) -> Self {
            Self {
                fetch_result: Err(err.clone()),
                put_result: Err(err),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn clear_calls(&self) {
            self.calls.borrow_mut().clear();
        }

        fn calls(&self) -> Vec<StoreCall> {
            self.calls.borrow().clone()
        }
    }

    impl SaveStore for MockStore {
        async fn fetch(&self, _key: &SaveKey) -> Result<Option<SaveBlob>, StoreError> {
            self.calls.borrow_mut().push(StoreCall::Fetch);
            self.fetch_result.clone()
        }

        async fn put(&self, _key: &SaveKey, blob: &SaveBlob) -> Result<(), StoreError> {
            self.calls
                .borrow_mut()
                .push(StoreCall::Put(blob.as_bytes().to_vec()));
            self.put_result.clone()
        }

        fn put_detached(&self, _key: &SaveKey, blob: &SaveBlob) -> bool {
            self.calls
                .borrow_mut()
                .push(StoreCall::PutDetached(blob.as_bytes().to_vec()));
            true
        }
    }

    struct MockEmulator {
        ready: bool,
        capture: Capture,
        reject_restore: bool,
        restored: Vec<Vec<u8>>,
    }

    impl MockEmulator {
        fn ready_with(capture: Capture) -> Self {
            Self {
                ready: true,
                capture,
                reject_restore: false,
                restored: Vec::new(),
            }
        }

        fn not_ready() -> Self {
            Self {
                ready: false,
                ..Self::ready_with(Capture::Unavailable)
            }
        }
    }

    impl EmulatorCapability for MockEmulator {
        fn is_ready(&self) -> bool {
            self.ready
        }

        fn capture_save(&self) -> Capture {
            self.capture.clone()
        }

        fn restore_save(&mut self, blob: &SaveBlob) -> Result<(), EmulatorError> {
            if self.reject_restore {
                return Err(EmulatorError::RestoreRejected);
            }
            self.restored.push(blob.as_bytes().to_vec());
            Ok(())
        }
    }

    fn controller(
        store: MockStore,
        emulator: MockEmulator,
    ) -> SessionController<MockStore, MockEmulator> {
        SessionController::new(SaveKey::new("gb", "mario"), store, emulator)
    }

    #[test]
    fn entry_load_with_no_save_reaches_ready_without_restore() {
        let mut c = controller(MockStore::empty(), MockEmulator::ready_with(Capture::Empty));
        assert_eq!(block_on(c.start()), EntryOutcome::Fresh);
        assert_eq!(c.state(), SessionState::Ready);
        assert_eq!(c.store.calls(), [StoreCall::Fetch]);
        assert!(c.emulator.restored.is_empty());
    }

    #[test]
    fn entry_load_returns_the_existing_blob() {
        let mut c = controller(
            MockStore::with_blob(&[1, 2, 3]),
            MockEmulator::ready_with(Capture::Empty),
        );
        assert_eq!(
            block_on(c.start()),
            EntryOutcome::Restore(SaveBlob::new(vec![1, 2, 3]))
        );
        assert_eq!(c.state(), SessionState::Ready);
    }

    #[test]
    fn entry_load_failure_falls_back_to_fresh() {
        let mut c = controller(
            MockStore::failing(StoreError::Status(500)),
            MockEmulator::ready_with(Capture::Empty),
        );
        assert_eq!(block_on(c.start()), EntryOutcome::Fresh);
        assert_eq!(c.state(), SessionState::Ready);
    }

    #[test]
    fn manual_save_writes_captured_data() {
        let mut c = controller(
            MockStore::empty(),
            MockEmulator::ready_with(Capture::Data(SaveBlob::new(vec![7, 8]))),
        );
        block_on(c.start());
        c.store.clear_calls();

        assert_eq!(block_on(c.save()), Feedback::Saved);
        assert_eq!(c.store.calls(), [StoreCall::Put(vec![7, 8])]);
        assert_eq!(c.state(), SessionState::Ready);
    }

    #[test]
    fn nothing_to_save_issues_no_store_call() {
        let mut c = controller(MockStore::empty(), MockEmulator::ready_with(Capture::Empty));
        block_on(c.start());
        c.store.clear_calls();

        assert_eq!(block_on(c.save()), Feedback::NothingToSave);
        assert!(c.store.calls().is_empty());
    }

    #[test]
    fn save_with_unready_emulator_reports_not_ready() {
        let mut c = controller(MockStore::empty(), MockEmulator::not_ready());
        block_on(c.start());
        c.store.clear_calls();

        assert_eq!(block_on(c.save()), Feedback::NotReady);
        assert!(c.store.calls().is_empty());
    }

    #[test]
    fn failed_write_reports_and_recovers() {
        let mut c = controller(
            MockStore::failing(StoreError::Status(500)),
            MockEmulator::ready_with(Capture::Data(SaveBlob::new(vec![9]))),
        );
        block_on(c.start());

        assert_eq!(block_on(c.save()), Feedback::SaveFailed);
        assert_eq!(c.state(), SessionState::Ready);
        // The session stays usable; a retry reaches the store again.
        assert_eq!(block_on(c.save()), Feedback::SaveFailed);
    }

    #[test]
    fn manual_load_reports_no_save_distinctly_from_transport_failure() {
        let mut missing = controller(MockStore::empty(), MockEmulator::ready_with(Capture::Empty));
        block_on(missing.start());
        assert_eq!(block_on(missing.load()), Feedback::NoSave);

        let mut failing = controller(
            MockStore::failing(StoreError::Status(500)),
            MockEmulator::ready_with(Capture::Empty),
        );
        block_on(failing.start());
        assert_eq!(block_on(failing.load()), Feedback::LoadFailed);
    }

    #[test]
    fn manual_load_hands_the_blob_to_the_emulator() {
        let mut c = controller(
            MockStore::with_blob(&[4, 5, 6]),
            MockEmulator::ready_with(Capture::Empty),
        );
        block_on(c.start());

        assert_eq!(block_on(c.load()), Feedback::Loaded);
        assert_eq!(c.emulator.restored, [vec![4, 5, 6]]);
        assert_eq!(c.state(), SessionState::Ready);
    }

    #[test]
    fn rejected_restore_reports_load_failed() {
        let mut emulator = MockEmulator::ready_with(Capture::Empty);
        emulator.reject_restore = true;
        let mut c = controller(MockStore::with_blob(&[1]), emulator);
        block_on(c.start());

        assert_eq!(block_on(c.load()), Feedback::LoadFailed);
        assert_eq!(c.state(), SessionState::Ready);
    }

    #[test]
    fn manual_load_with_unready_emulator_reports_not_ready() {
        let emulator = MockEmulator::ready_with(Capture::Empty);
        let mut c = controller(MockStore::with_blob(&[1]), emulator);
        block_on(c.start());
        c.emulator.ready = false;

        assert_eq!(block_on(c.load()), Feedback::NotReady);
        assert!(c.emulator.restored.is_empty());
    }

    #[test]
    fn operations_before_start_are_rejected() {
        let mut c = controller(MockStore::empty(), MockEmulator::ready_with(Capture::Empty));
        assert_eq!(block_on(c.save()), Feedback::Busy);
        assert_eq!(block_on(c.load()), Feedback::Busy);
        assert!(c.store.calls().is_empty());
    }

    #[test]
    fn teardown_attempts_exactly_one_detached_write() {
        let mut c = controller(
            MockStore::empty(),
            MockEmulator::ready_with(Capture::Data(SaveBlob::new(vec![2, 4]))),
        );
        block_on(c.start());
        c.store.clear_calls();

        assert!(c.teardown());
        assert_eq!(c.state(), SessionState::Terminated);
        assert_eq!(c.store.calls(), [StoreCall::PutDetached(vec![2, 4])]);

        // Idempotent: a second teardown writes nothing.
        assert!(!c.teardown());
        assert_eq!(c.store.calls(), [StoreCall::PutDetached(vec![2, 4])]);
    }

    #[test]
    fn teardown_without_data_writes_nothing() {
        let mut empty = controller(MockStore::empty(), MockEmulator::ready_with(Capture::Empty));
        block_on(empty.start());
        empty.store.clear_calls();
        assert!(!empty.teardown());
        assert!(empty.store.calls().is_empty());

        let mut unready = controller(MockStore::empty(), MockEmulator::not_ready());
        block_on(unready.start());
        unready.store.clear_calls();
        assert!(!unready.teardown());
        assert!(unready.store.calls().is_empty());
    }

    #[test]
    fn operations_after_teardown_are_rejected() {
        let mut c = controller(MockStore::empty(), MockEmulator::ready_with(Capture::Empty));
        block_on(c.start());
        c.teardown();
        c.store.clear_calls();

        assert_eq!(block_on(c.save()), Feedback::Busy);
        assert_eq!(block_on(c.load()), Feedback::Busy);
        assert!(c.store.calls().is_empty());
    }

    #[test]
    fn back_to_back_save_and_load_never_interleave() {
        let mut c = controller(
            MockStore::with_blob(&[3]),
            MockEmulator::ready_with(Capture::Data(SaveBlob::new(vec![3]))),
        );
        block_on(c.start());
        c.store.clear_calls();

        assert_eq!(block_on(c.save()), Feedback::Saved);
        assert_eq!(block_on(c.load()), Feedback::Loaded);
        // One complete write, then one complete read; no partial order.
        assert_eq!(c.store.calls(), [StoreCall::Put(vec![3]), StoreCall::Fetch]);
    }
}
