//! Profile manager: the single writer for every profile
//!
//! All edits flow through [`ProfileManager`] so persistence and change
//! notification happen uniformly. Readers take cheap `Arc<Profile>`
//! snapshots that later edits never change: an edit works on a draft copy and
//! swaps it in only if it succeeds.
//!
//! The write lock is held until the change is on disk and subscribers have
//! been notified, so files and events follow revision order.
//!
//! On disk (when opened with a storage directory):
//!
//! ```text
//! <dir>/state.json            active profile id
//! <dir>/profiles/<id>.json    one file per profile
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mapping::{
    load_default_profile, Binding, ChordMapping, ControllerButton, GestureMapping,
    JoystickSettings, KeyboardSettings, Layer, LedSettings, Macro, MappingError,
    MotionGestureType, Profile, Resolver, ResolverSettings, Script, SequenceMapping,
    TouchpadSettings, FORMAT_VERSION,
};

const PROFILES_DIR: &str = "profiles";
const STATE_FILE: &str = "state.json";

/// Failures reading or writing profile data
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid profile JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Mapping(#[from] MappingError),
}

/// Change notification sent to subscribers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileEvent {
    Created { profile_id: Uuid, revision: u64 },
    Updated { profile_id: Uuid, revision: u64 },
    Deleted { profile_id: Uuid, revision: u64 },
    ActiveChanged { profile_id: Uuid, revision: u64 },
}

impl ProfileEvent {
    pub fn revision(&self) -> u64 {
        match *self {
            ProfileEvent::Created { revision, .. }
            | ProfileEvent::Updated { revision, .. }
            | ProfileEvent::Deleted { revision, .. }
            | ProfileEvent::ActiveChanged { revision, .. } => revision,
        }
    }
}

/// Persisted manager state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    /// Schema version for forward compatibility
    #[serde(default)]
    version: u32,
    #[serde(default)]
    active_profile_id: Option<Uuid>,
}

impl StoreState {
    const CURRENT_VERSION: u32 = 1;
}

#[derive(Debug)]
struct Inner {
    profiles: Vec<Arc<Profile>>,
    active: Uuid,
    revision: u64,
}

impl Inner {
    fn slot_mut(&mut self, id: Uuid) -> Result<&mut Arc<Profile>, MappingError> {
        self.profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(MappingError::UnknownProfile(id))
    }

    fn get(&self, id: Uuid) -> Option<&Arc<Profile>> {
        self.profiles.iter().find(|p| p.id == id)
    }

    fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    fn bump(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

/// Owner of every profile and of the active-profile selection
pub struct ProfileManager {
    inner: RwLock<Inner>,
    storage: Option<PathBuf>,
    subscribers: Mutex<Vec<flume::Sender<ProfileEvent>>>,
}

impl std::fmt::Debug for ProfileManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("ProfileManager")
            .field("profiles", &inner.profiles.len())
            .field("active", &inner.active)
            .field("revision", &inner.revision)
            .field("storage", &self.storage)
            .finish()
    }
}

impl Default for ProfileManager {
    fn default() -> Self {
        Self::new(load_default_profile())
    }
}

impl ProfileManager {
    /// In-memory manager holding a single profile
    pub fn new(profile: Profile) -> Self {
        let active = profile.id;
        Self {
            inner: RwLock::new(Inner {
                profiles: vec![Arc::new(profile)],
                active,
                revision: 0,
            }),
            storage: None,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Open (or initialize) a storage directory
    ///
    /// Unreadable profile files are skipped with a warning. An empty
    /// directory is seeded with the default profile.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistError> {
        let dir = dir.into();
        let profiles_dir = dir.join(PROFILES_DIR);
        fs::create_dir_all(&profiles_dir)?;

        let mut paths: Vec<PathBuf> = fs::read_dir(&profiles_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut profiles = Vec::with_capacity(paths.len());
        for path in paths {
            match read_profile(&path) {
                Ok(profile) => profiles.push(profile),
                Err(e) => tracing::warn!("Skipping profile {}: {}", path.display(), e),
            }
        }
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.name.cmp(&b.name)));

        if profiles.is_empty() {
            let profile = load_default_profile();
            write_profile(&dir, &profile)?;
            tracing::info!("Seeded {} with the default profile", dir.display());
            profiles.push(profile);
        }

        let state: StoreState = fs::read_to_string(dir.join(STATE_FILE))
            .ok()
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default();
        let active = state
            .active_profile_id
            .filter(|id| profiles.iter().any(|p| p.id == *id))
            .unwrap_or(profiles[0].id);

        tracing::info!(
            "Loaded {} profile(s) from {}",
            profiles.len(),
            dir.display()
        );

        Ok(Self {
            inner: RwLock::new(Inner {
                profiles: profiles.into_iter().map(Arc::new).collect(),
                active,
                revision: 0,
            }),
            storage: Some(dir),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage.as_deref()
    }

    /// Receive a [`ProfileEvent`] after every change
    pub fn subscribe(&self) -> flume::Receiver<ProfileEvent> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    pub fn profiles(&self) -> Vec<Arc<Profile>> {
        self.inner.read().profiles.clone()
    }

    pub fn profile(&self, id: Uuid) -> Option<Arc<Profile>> {
        self.inner.read().get(id).cloned()
    }

    pub fn active_profile_id(&self) -> Uuid {
        self.inner.read().active
    }

    pub fn active_profile(&self) -> Arc<Profile> {
        let inner = self.inner.read();
        match inner.get(inner.active) {
            Some(profile) => Arc::clone(profile),
            // The active id is always kept valid; fall back to the first profile
            None => Arc::clone(&inner.profiles[0]),
        }
    }

    /// Resolver over the current active profile
    pub fn resolver(&self, settings: ResolverSettings) -> Resolver {
        Resolver::with_settings(self.active_profile(), settings)
    }

    // ------------------------------------------------------------------
    // Profile lifecycle
    // ------------------------------------------------------------------

    pub fn create_profile(&self, name: impl Into<String>) -> Arc<Profile> {
        self.insert(Profile::new(name))
    }

    /// Copy a profile under a new id and name
    pub fn duplicate_profile(
        &self,
        id: Uuid,
        name: impl Into<String>,
    ) -> Result<Arc<Profile>, MappingError> {
        let source = self.profile(id).ok_or(MappingError::UnknownProfile(id))?;
        let mut copy = (*source).clone();
        let now = chrono::Utc::now();
        copy.id = Uuid::new_v4();
        copy.name = name.into();
        copy.created_at = now;
        copy.modified_at = now;
        Ok(self.insert(copy))
    }

    pub fn rename_profile(
        &self,
        id: Uuid,
        name: impl Into<String>,
    ) -> Result<Arc<Profile>, MappingError> {
        let name = name.into();
        self.update_profile(id, |profile| {
            profile.name = name;
            Ok(())
        })?;
        self.profile(id).ok_or(MappingError::UnknownProfile(id))
    }

    /// Delete a profile; the last remaining profile cannot be deleted
    ///
    /// Deleting the active profile activates the first remaining one.
    pub fn delete_profile(&self, id: Uuid) -> Result<Arc<Profile>, MappingError> {
        let mut inner = self.inner.write();
        let index = inner
            .profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or(MappingError::UnknownProfile(id))?;
        if inner.profiles.len() == 1 {
            return Err(MappingError::LastProfile);
        }
        let removed = inner.profiles.remove(index);
        let new_active = (inner.active == id).then(|| inner.profiles[0].id);
        if let Some(active) = new_active {
            inner.active = active;
        }
        let revision = inner.bump();

        tracing::info!("Deleted profile \"{}\"", removed.name);
        if let Some(dir) = &self.storage {
            let path = profile_path(dir, id);
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
        self.broadcast(ProfileEvent::Deleted {
            profile_id: id,
            revision,
        });
        if let Some(profile_id) = new_active {
            self.persist_state(profile_id);
            self.broadcast(ProfileEvent::ActiveChanged {
                profile_id,
                revision,
            });
        }
        drop(inner);
        Ok(removed)
    }

    pub fn set_active_profile(&self, id: Uuid) -> Result<Arc<Profile>, MappingError> {
        let mut inner = self.inner.write();
        let profile = inner
            .get(id)
            .cloned()
            .ok_or(MappingError::UnknownProfile(id))?;
        if inner.active == id {
            return Ok(profile);
        }
        inner.active = id;
        let revision = inner.bump();
        tracing::info!("Active profile is now \"{}\"", profile.name);
        self.persist_state(id);
        self.broadcast(ProfileEvent::ActiveChanged {
            profile_id: id,
            revision,
        });
        drop(inner);
        Ok(profile)
    }

    /// Add a profile from outside (file, catalog, Stream Deck)
    ///
    /// A profile whose id is already present is given a fresh id.
    pub fn import_profile(&self, mut profile: Profile) -> Arc<Profile> {
        if profile.format_version > FORMAT_VERSION {
            tracing::warn!(
                "Importing profile \"{}\" written by a newer format (v{})",
                profile.name,
                profile.format_version
            );
        }
        profile.format_version = FORMAT_VERSION;
        for issue in profile.validate() {
            tracing::warn!("Imported profile \"{}\": {}", profile.name, issue);
        }
        self.insert(profile)
    }

    pub fn import_profile_json(&self, json: &str) -> Result<Arc<Profile>, PersistError> {
        let profile = Profile::from_json(json)?;
        Ok(self.import_profile(profile))
    }

    pub fn export_profile(&self, id: Uuid) -> Result<String, PersistError> {
        let profile = self.profile(id).ok_or(MappingError::UnknownProfile(id))?;
        Ok(profile.to_json()?)
    }

    fn insert(&self, mut profile: Profile) -> Arc<Profile> {
        let mut inner = self.inner.write();
        if inner.contains(profile.id) {
            profile.id = Uuid::new_v4();
        }
        let profile = Arc::new(profile);
        inner.profiles.push(Arc::clone(&profile));
        let revision = inner.bump();
        tracing::info!("Added profile \"{}\" ({})", profile.name, profile.id);
        self.persist_profile(&profile);
        self.broadcast(ProfileEvent::Created {
            profile_id: profile.id,
            revision,
        });
        drop(inner);
        profile
    }

    // ------------------------------------------------------------------
    // Edits
    // ------------------------------------------------------------------

    /// Apply an edit to the active profile
    pub fn update<T>(
        &self,
        edit: impl FnOnce(&mut Profile) -> Result<T, MappingError>,
    ) -> Result<T, MappingError> {
        let id = self.active_profile_id();
        self.update_profile(id, edit)
    }

    /// Apply an edit to any profile
    ///
    /// A failed edit leaves the profile untouched and sends no event. The
    /// edit runs under the write lock and must not call back into the
    /// manager.
    pub fn update_profile<T>(
        &self,
        id: Uuid,
        edit: impl FnOnce(&mut Profile) -> Result<T, MappingError>,
    ) -> Result<T, MappingError> {
        let mut inner = self.inner.write();
        let slot = inner.slot_mut(id)?;
        let mut draft = (**slot).clone();
        let value = edit(&mut draft)?;
        draft.touch();
        let snapshot = Arc::new(draft);
        *slot = Arc::clone(&snapshot);
        let revision = inner.bump();
        self.persist_profile(&snapshot);
        self.broadcast(ProfileEvent::Updated {
            profile_id: id,
            revision,
        });
        drop(inner);
        Ok(value)
    }

    pub fn set_mapping(
        &self,
        button: ControllerButton,
        binding: Binding,
    ) -> Result<Binding, MappingError> {
        self.update(|p| p.set_mapping(button, binding).cloned())
    }

    pub fn clear_mapping(&self, button: ControllerButton) -> Result<Option<Binding>, MappingError> {
        self.update(|p| Ok(p.clear_mapping(button)))
    }

    pub fn swap_mappings(
        &self,
        a: ControllerButton,
        b: ControllerButton,
        layer: Option<Uuid>,
    ) -> Result<(), MappingError> {
        self.update(|p| p.swap_mappings(a, b, layer))
    }

    pub fn create_layer(
        &self,
        name: impl Into<String>,
        activator: Option<ControllerButton>,
    ) -> Result<Layer, MappingError> {
        let name = name.into();
        self.update(|p| p.create_layer(name, activator).cloned())
    }

    pub fn rename_layer(&self, id: Uuid, name: impl Into<String>) -> Result<Layer, MappingError> {
        let name = name.into();
        self.update(|p| p.rename_layer(id, name).cloned())
    }

    pub fn set_layer_activator(
        &self,
        id: Uuid,
        activator: Option<ControllerButton>,
    ) -> Result<Layer, MappingError> {
        self.update(|p| p.set_layer_activator(id, activator).cloned())
    }

    pub fn delete_layer(&self, id: Uuid) -> Result<Layer, MappingError> {
        self.update(|p| p.delete_layer(id))
    }

    pub fn set_layer_mapping(
        &self,
        layer: Uuid,
        button: ControllerButton,
        binding: Binding,
    ) -> Result<Binding, MappingError> {
        self.update(|p| p.set_layer_mapping(layer, button, binding).cloned())
    }

    pub fn clear_layer_mapping(
        &self,
        layer: Uuid,
        button: ControllerButton,
    ) -> Result<Option<Binding>, MappingError> {
        self.update(|p| p.clear_layer_mapping(layer, button))
    }

    pub fn add_chord(&self, chord: ChordMapping) -> Result<ChordMapping, MappingError> {
        self.update(|p| p.add_chord(chord).cloned())
    }

    pub fn update_chord(&self, chord: ChordMapping) -> Result<ChordMapping, MappingError> {
        self.update(|p| p.update_chord(chord).cloned())
    }

    pub fn remove_chord(&self, id: Uuid) -> Result<ChordMapping, MappingError> {
        self.update(|p| p.remove_chord(id))
    }

    pub fn add_sequence(&self, sequence: SequenceMapping) -> Result<SequenceMapping, MappingError> {
        self.update(|p| p.add_sequence(sequence).cloned())
    }

    pub fn update_sequence(
        &self,
        sequence: SequenceMapping,
    ) -> Result<SequenceMapping, MappingError> {
        self.update(|p| p.update_sequence(sequence).cloned())
    }

    pub fn remove_sequence(&self, id: Uuid) -> Result<SequenceMapping, MappingError> {
        self.update(|p| p.remove_sequence(id))
    }

    /// Add or replace the mapping for a gesture type
    pub fn set_gesture(&self, gesture: GestureMapping) -> Result<GestureMapping, MappingError> {
        self.update(|p| Ok(p.set_gesture(gesture).clone()))
    }

    pub fn remove_gesture(
        &self,
        gesture_type: MotionGestureType,
    ) -> Result<Option<GestureMapping>, MappingError> {
        self.update(|p| Ok(p.remove_gesture(gesture_type)))
    }

    pub fn upsert_macro(&self, item: Macro) -> Result<Macro, MappingError> {
        self.update(|p| Ok(p.upsert_macro(item).clone()))
    }

    pub fn remove_macro(&self, id: Uuid) -> Result<Macro, MappingError> {
        self.update(|p| p.remove_macro(id))
    }

    pub fn upsert_script(&self, item: Script) -> Result<Script, MappingError> {
        self.update(|p| Ok(p.upsert_script(item).clone()))
    }

    pub fn remove_script(&self, id: Uuid) -> Result<Script, MappingError> {
        self.update(|p| p.remove_script(id))
    }

    pub fn set_joystick_settings(&self, settings: JoystickSettings) -> Result<(), MappingError> {
        self.update(|p| {
            p.joystick_settings = settings;
            Ok(())
        })
    }

    pub fn set_touchpad_settings(&self, settings: TouchpadSettings) -> Result<(), MappingError> {
        self.update(|p| {
            p.touchpad_settings = settings;
            Ok(())
        })
    }

    pub fn set_led_settings(&self, settings: LedSettings) -> Result<(), MappingError> {
        self.update(|p| {
            p.led_settings = settings;
            Ok(())
        })
    }

    pub fn set_keyboard_settings(&self, settings: KeyboardSettings) -> Result<(), MappingError> {
        self.update(|p| {
            p.keyboard_settings = settings;
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Persistence and notification
    // ------------------------------------------------------------------

    fn persist_profile(&self, profile: &Profile) {
        let Some(dir) = &self.storage else {
            return;
        };
        if let Err(e) = write_profile(dir, profile) {
            tracing::warn!("Failed to save profile \"{}\": {}", profile.name, e);
        }
    }

    fn persist_state(&self, active: Uuid) {
        let Some(dir) = &self.storage else {
            return;
        };
        let state = StoreState {
            version: StoreState::CURRENT_VERSION,
            active_profile_id: Some(active),
        };
        let result = serde_json::to_string_pretty(&state)
            .map_err(PersistError::from)
            .and_then(|contents| Ok(fs::write(dir.join(STATE_FILE), contents)?));
        if let Err(e) = result {
            tracing::warn!("Failed to save profile state: {}", e);
        }
    }

    fn broadcast(&self, event: ProfileEvent) {
        tracing::debug!("Profile event: {:?}", event);
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event).is_ok());
    }
}

fn profile_path(dir: &Path, id: Uuid) -> PathBuf {
    dir.join(PROFILES_DIR).join(format!("{}.json", id))
}

fn read_profile(path: &Path) -> Result<Profile, PersistError> {
    let contents = fs::read_to_string(path)?;
    Ok(Profile::from_json(&contents)?)
}

fn write_profile(dir: &Path, profile: &Profile) -> Result<(), PersistError> {
    fs::create_dir_all(dir.join(PROFILES_DIR))?;
    fs::write(profile_path(dir, profile.id), profile.to_json()?)?;
    Ok(())
}
