pub mod builtin;

use std::collections::HashSet;

use log::warn;

use crate::{
    HudError,
    surface::{Color, DrawableSurface},
    telemetry::TelemetryState,
};

pub use builtin::builtin_registry;

/// Paints one complete frame from a telemetry snapshot.
///
/// Implementations must repaint the whole surface, keep no references to the state past
/// the call, and produce identical pixels for identical inputs.
pub type RenderFn = fn(&mut dyn DrawableSurface, &TelemetryState) -> Result<(), HudError>;

#[derive(Clone, Debug)]
pub struct ProgramDescriptor {
    pub id: String,
    pub label: String,
    pub tint: Color,
    pub preferred_interval_ms: u64,
    pub render: RenderFn,
}

impl ProgramDescriptor {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        tint: Color,
        preferred_interval_ms: u64,
        render: RenderFn,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            tint,
            preferred_interval_ms,
            render,
        }
    }

    pub fn render(
        &self,
        surface: &mut dyn DrawableSurface,
        state: &TelemetryState,
    ) -> Result<(), HudError> {
        (self.render)(surface, state)
    }
}

impl PartialEq for ProgramDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// Loosely typed program request as it arrives from scene code or UI pickers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgramSelector {
    Default,
    Id(String),
    Index(i64),
}

impl From<&str> for ProgramSelector {
    fn from(value: &str) -> Self {
        ProgramSelector::Id(value.to_string())
    }
}

impl From<String> for ProgramSelector {
    fn from(value: String) -> Self {
        ProgramSelector::Id(value)
    }
}

impl From<i64> for ProgramSelector {
    fn from(value: i64) -> Self {
        ProgramSelector::Index(value)
    }
}

impl<T: Into<ProgramSelector>> From<Option<T>> for ProgramSelector {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ProgramSelector::Default)
    }
}

/// Fixed, ordered, read-only list of programs. Construction rejects an empty list, so
/// every resolution below returns a descriptor.
#[derive(Clone, Debug)]
pub struct ProgramRegistry {
    programs: Vec<ProgramDescriptor>,
}

impl ProgramRegistry {
    pub fn new(programs: Vec<ProgramDescriptor>) -> Result<Self, HudError> {
        if programs.is_empty() {
            return Err(HudError::EmptyRegistry);
        }

        let mut seen = HashSet::new();
        for program in &programs {
            if program.id.is_empty() {
                return Err(HudError::InvalidParameter {
                    field: "program.id".to_string(),
                    reason: format!("program '{}' has an empty id", program.label),
                });
            }
            if program.preferred_interval_ms == 0 {
                return Err(HudError::InvalidParameter {
                    field: "program.preferred_interval_ms".to_string(),
                    reason: format!("program '{}' must have a positive interval", program.id),
                });
            }
            if !seen.insert(program.id.as_str()) {
                return Err(HudError::DuplicateProgram {
                    id: program.id.clone(),
                });
            }
        }

        Ok(Self { programs })
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProgramDescriptor> {
        self.programs.iter()
    }

    pub fn get(&self, id: &str) -> Option<&ProgramDescriptor> {
        self.programs.iter().find(|p| p.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.programs.iter().position(|p| p.id == id)
    }

    /// The documented fallback: the first registered program.
    pub fn default_program(&self) -> &ProgramDescriptor {
        &self.programs[0]
    }

    fn wrap_index(&self, n: i64) -> usize {
        n.rem_euclid(self.programs.len() as i64) as usize
    }

    /// Cyclic lookup; any integer maps into range.
    pub fn resolve_by_index(&self, n: i64) -> &ProgramDescriptor {
        &self.programs[self.wrap_index(n)]
    }

    fn id_position(&self, id: Option<&str>) -> usize {
        let Some(id) = id.filter(|id| !id.is_empty()) else {
            return 0;
        };
        if let Some(position) = self.position(id) {
            return position;
        }
        if let Ok(index) = id.trim().parse::<i64>() {
            return self.wrap_index(index);
        }
        warn!(
            "Unknown program '{}', falling back to '{}'",
            id,
            self.default_program().id
        );
        0
    }

    /// Exact id match, then numeric index, then the default program.
    pub fn resolve_by_id(&self, id: Option<&str>) -> &ProgramDescriptor {
        &self.programs[self.id_position(id)]
    }

    /// Position in the registry of the program `selector` resolves to. Unknown ids are
    /// logged here, once per call.
    pub fn resolve_position(&self, selector: impl Into<ProgramSelector>) -> usize {
        match selector.into() {
            ProgramSelector::Default => 0,
            ProgramSelector::Id(id) => self.id_position(Some(&id)),
            ProgramSelector::Index(n) => self.wrap_index(n),
        }
    }

    pub fn resolve(&self, selector: impl Into<ProgramSelector>) -> &ProgramDescriptor {
        &self.programs[self.resolve_position(selector)]
    }
}
