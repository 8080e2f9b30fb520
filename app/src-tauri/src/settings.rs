use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::geometry::WindowBounds;

#[cfg(desktop)]
use tauri_plugin_global_shortcut::Shortcut;

// ============================================================================
// DEFAULTS - Single source of truth for everything the store can hold
// ============================================================================

/// Store file name inside the app data directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Page loaded when no URL was ever visited
pub const DEFAULT_URL: &str = "https://www.bilibili.com";

/// Resting opacity of the browser window on first run
pub const DEFAULT_OPACITY: f64 = 0.8;

/// Lowest opacity a user can dial in (the window must stay findable)
pub const MIN_OPACITY: f64 = 0.2;

pub const MAX_OPACITY: f64 = 1.0;

/// Opacity used while the browser window has input focus
pub const FOCUSED_OPACITY: f64 = 1.0;

/// Step applied by the increase/decrease opacity shortcuts
pub const OPACITY_STEP: f64 = 0.1;

pub const DEFAULT_MAIN_BOUNDS: WindowBounds = WindowBounds::sized(1000, 800);

pub const DEFAULT_BROWSER_BOUNDS: WindowBounds = WindowBounds::sized(960, 600);

pub const DEFAULT_ENABLE_GPU: bool = true;

pub const DEFAULT_ADVANCED_TOPMOST: bool = true;

/// Keys of the persisted document. Names are part of the on-disk format.
pub mod keys {
    pub const MAIN_WINDOW_BOUNDS: &str = "mainWindowBounds";
    pub const BROWSER_WINDOW_BOUNDS: &str = "browserWindowBounds";
    pub const LAST_URL: &str = "lastUrl";
    pub const SHORTCUTS: &str = "shortcuts";
    pub const BROWSER_OPACITY: &str = "browserOpacity";
    pub const ENABLE_GPU_ACCELERATION: &str = "enableGpuAcceleration";
    pub const ADVANCED_TOPMOST: &str = "advancedTopmost";
}

// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Settings store error: {0}")]
    Store(String),

    #[error("Failed to serialize setting '{key}': {source}")]
    Serialize {
        key: &'static str,
        source: serde_json::Error,
    },
}

/// Key/value persistence. Writes replace the whole value of a key.
pub trait SettingsStore: Send {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn save(&self) -> Result<(), SettingsError>;
}

/// `tauri-plugin-store` backed settings (`settings.json` in the app data dir).
pub struct TauriSettingsStore {
    store: Arc<tauri_plugin_store::Store<tauri::Wry>>,
}

impl TauriSettingsStore {
    pub fn open(app: &tauri::AppHandle) -> Result<Self, SettingsError> {
        use tauri_plugin_store::StoreExt;

        let store = app
            .store(SETTINGS_FILE)
            .map_err(|e| SettingsError::Store(e.to_string()))?;
        Ok(Self { store })
    }
}

impl SettingsStore for TauriSettingsStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.store.get(key)
    }

    fn set(&self, key: &str, value: Value) {
        self.store.set(key.to_string(), value);
    }

    fn save(&self) -> Result<(), SettingsError> {
        self.store
            .save()
            .map_err(|e| SettingsError::Store(e.to_string()))
    }
}

/// Helper to read a setting from the store with a default fallback
fn get_setting<T: serde::de::DeserializeOwned>(
    store: &dyn SettingsStore,
    key: &str,
    default: T,
) -> T {
    match store.get(key) {
        None | Some(Value::Null) => default,
        Some(raw) => serde_json::from_value(raw).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed setting '{}': {}", key, e);
            default
        }),
    }
}

/// Replace one key and flush the store to disk.
pub fn save_setting<T: Serialize>(
    store: &dyn SettingsStore,
    key: &'static str,
    value: &T,
) -> Result<(), SettingsError> {
    let value =
        serde_json::to_value(value).map_err(|source| SettingsError::Serialize { key, source })?;
    store.set(key, value);
    store.save()
}

// ============================================================================
// Shortcut bindings
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShortcutAction {
    ToggleBrowser,
    PlayPause,
    Rewind,
    Forward,
    IncreaseOpacity,
    DecreaseOpacity,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown shortcut action: {0}")]
pub struct UnknownAction(pub String);

impl ShortcutAction {
    pub const ALL: [ShortcutAction; 6] = [
        ShortcutAction::ToggleBrowser,
        ShortcutAction::PlayPause,
        ShortcutAction::Rewind,
        ShortcutAction::Forward,
        ShortcutAction::IncreaseOpacity,
        ShortcutAction::DecreaseOpacity,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToggleBrowser => "toggleBrowser",
            Self::PlayPause => "playPause",
            Self::Rewind => "rewind",
            Self::Forward => "forward",
            Self::IncreaseOpacity => "increaseOpacity",
            Self::DecreaseOpacity => "decreaseOpacity",
        }
    }

    pub fn default_binding(self) -> &'static str {
        match self {
            Self::ToggleBrowser => "Insert",
            Self::PlayPause => "Space",
            Self::Rewind => "Left",
            Self::Forward => "Right",
            Self::IncreaseOpacity => "Control+Up",
            Self::DecreaseOpacity => "Control+Down",
        }
    }

    /// Media actions drive the page and are bound to keys other apps need
    /// (Space, arrows), so they are only registered while the browser is on screen.
    pub fn is_media(self) -> bool {
        matches!(self, Self::PlayPause | Self::Rewind | Self::Forward)
    }
}

impl FromStr for ShortcutAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

impl fmt::Display for ShortcutAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a combination for comparison (handles "ctrl" vs "control" differences)
pub fn normalize_combination(s: &str) -> String {
    s.split('+')
        .map(|part| match part.trim().to_lowercase().as_str() {
            "ctrl" => "control".to_string(),
            "cmd" | "command" | "meta" | "win" => "super".to_string(),
            "option" => "alt".to_string(),
            "arrowup" => "up".to_string(),
            "arrowdown" => "down".to_string(),
            "arrowleft" => "left".to_string(),
            "arrowright" => "right".to_string(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("+")
}

/// Convert a stored accelerator ("Control+Up", "Meta+K") into the form the
/// global shortcut plugin parses.
#[cfg(desktop)]
pub fn to_shortcut(combination: &str) -> Result<Shortcut, String> {
    let normalized = normalize_combination(combination);
    Shortcut::from_str(&normalized)
        .map_err(|e| format!("Failed to parse shortcut '{}': {:?}", combination, e))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{combination}' is already bound to {owner}")]
pub struct BindingConflict {
    pub combination: String,
    pub owner: ShortcutAction,
    pub requested: ShortcutAction,
}

/// Action → key combination. An empty combination means "unbound".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutBindings(BTreeMap<ShortcutAction, String>);

impl Default for ShortcutBindings {
    fn default() -> Self {
        Self(
            ShortcutAction::ALL
                .into_iter()
                .map(|action| (action, action.default_binding().to_string()))
                .collect(),
        )
    }
}

impl ShortcutBindings {
    /// Build bindings from a raw name → combination map, filling actions the
    /// map does not mention with their defaults.
    pub fn from_raw(raw: BTreeMap<String, String>) -> Self {
        let mut bindings = Self::default();
        for (name, combination) in raw {
            match name.parse::<ShortcutAction>() {
                Ok(action) => {
                    bindings.0.insert(action, combination.trim().to_string());
                }
                Err(e) => log::warn!("Dropping binding: {}", e),
            }
        }
        bindings
    }

    /// The bound combination, or `None` when the action is unbound.
    pub fn get(&self, action: ShortcutAction) -> Option<&str> {
        self.0
            .get(&action)
            .map(String::as_str)
            .filter(|combination| !combination.is_empty())
    }

    /// Bound (action, combination) pairs in action order.
    pub fn iter(&self) -> impl Iterator<Item = (ShortcutAction, &str)> {
        ShortcutAction::ALL
            .into_iter()
            .filter_map(|action| self.get(action).map(|combination| (action, combination)))
    }

    fn owner_of(&self, combination: &str, except: ShortcutAction) -> Option<ShortcutAction> {
        let wanted = normalize_combination(combination);
        self.iter()
            .find(|(action, bound)| *action != except && normalize_combination(bound) == wanted)
            .map(|(action, _)| action)
    }

    /// Bind `action` to `combination`, refusing combinations another action owns.
    pub fn rebind(
        &mut self,
        action: ShortcutAction,
        combination: &str,
    ) -> Result<(), BindingConflict> {
        let combination = combination.trim();
        if !combination.is_empty() {
            if let Some(owner) = self.owner_of(combination, action) {
                return Err(BindingConflict {
                    combination: combination.to_string(),
                    owner,
                    requested: action,
                });
            }
        }
        self.0.insert(action, combination.to_string());
        Ok(())
    }

    /// First pair of actions sharing a combination, if any.
    pub fn find_conflict(&self) -> Option<BindingConflict> {
        self.iter().find_map(|(action, combination)| {
            self.owner_of(combination, action)
                .filter(|owner| *owner < action)
                .map(|owner| BindingConflict {
                    combination: combination.to_string(),
                    owner,
                    requested: action,
                })
        })
    }
}

impl Serialize for ShortcutBindings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ShortcutBindings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        Ok(Self::from_raw(raw))
    }
}

// ============================================================================
// Opacity
// ============================================================================

/// Browser window opacity, always within [MIN_OPACITY, MAX_OPACITY] and
/// rounded to two decimals so repeated steps land on exact values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct OpacityLevel(f64);

impl OpacityLevel {
    pub fn new(value: f64) -> Self {
        if !value.is_finite() {
            return Self(DEFAULT_OPACITY);
        }
        let clamped = value.clamp(MIN_OPACITY, MAX_OPACITY);
        Self((clamped * 100.0).round() / 100.0)
    }

    pub fn adjusted(self, delta: f64) -> Self {
        Self::new(self.0 + delta)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for OpacityLevel {
    fn default() -> Self {
        Self(DEFAULT_OPACITY)
    }
}

impl<'de> Deserialize<'de> for OpacityLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Self::new)
    }
}

// ============================================================================
// Settings document
// ============================================================================

/// In-memory copy of the persisted settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellSettings {
    pub main_window_bounds: Option<WindowBounds>,
    pub browser_window_bounds: Option<WindowBounds>,
    pub last_url: String,
    pub shortcuts: ShortcutBindings,
    pub browser_opacity: OpacityLevel,
    pub enable_gpu_acceleration: bool,
    pub advanced_topmost: bool,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            main_window_bounds: None,
            browser_window_bounds: None,
            last_url: DEFAULT_URL.to_string(),
            shortcuts: ShortcutBindings::default(),
            browser_opacity: OpacityLevel::default(),
            enable_gpu_acceleration: DEFAULT_ENABLE_GPU,
            advanced_topmost: DEFAULT_ADVANCED_TOPMOST,
        }
    }
}

impl ShellSettings {
    /// Read every key, falling back to the built-in default for missing or
    /// malformed values.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let defaults = Self::default();
        let last_url: String = get_setting(store, keys::LAST_URL, defaults.last_url);
        Self {
            main_window_bounds: get_setting(store, keys::MAIN_WINDOW_BOUNDS, None),
            browser_window_bounds: get_setting(store, keys::BROWSER_WINDOW_BOUNDS, None),
            last_url: if last_url.trim().is_empty() {
                DEFAULT_URL.to_string()
            } else {
                last_url
            },
            shortcuts: get_setting(store, keys::SHORTCUTS, defaults.shortcuts),
            browser_opacity: get_setting(store, keys::BROWSER_OPACITY, defaults.browser_opacity),
            enable_gpu_acceleration: get_setting(
                store,
                keys::ENABLE_GPU_ACCELERATION,
                defaults.enable_gpu_acceleration,
            ),
            advanced_topmost: get_setting(store, keys::ADVANCED_TOPMOST, defaults.advanced_topmost),
        }
    }
}

/// Ensure the settings the UI shows match what the backend will use.
///
/// Seeds missing/null keys with defaults without overwriting existing values.
/// Window bounds are left alone: they only exist once a window was moved.
pub fn seed_defaults(store: &dyn SettingsStore) -> Result<(), SettingsError> {
    let defaults = ShellSettings::default();
    let shortcuts = serde_json::to_value(&defaults.shortcuts).map_err(|source| {
        SettingsError::Serialize {
            key: keys::SHORTCUTS,
            source,
        }
    })?;

    let mut dirty = false;
    let mut set_if_missing = |key: &'static str, value: Value| {
        if matches!(store.get(key), None | Some(Value::Null)) {
            store.set(key, value);
            dirty = true;
        }
    };

    set_if_missing(keys::LAST_URL, Value::from(defaults.last_url.clone()));
    set_if_missing(keys::SHORTCUTS, shortcuts);
    set_if_missing(keys::BROWSER_OPACITY, Value::from(defaults.browser_opacity.value()));
    set_if_missing(
        keys::ENABLE_GPU_ACCELERATION,
        Value::from(defaults.enable_gpu_acceleration),
    );
    set_if_missing(keys::ADVANCED_TOPMOST, Value::from(defaults.advanced_topmost));

    if dirty {
        // Runtime fallbacks still work if this fails.
        if let Err(e) = store.save() {
            log::warn!("Failed to save seeded default settings: {}", e);
        }
    }

    Ok(())
}
