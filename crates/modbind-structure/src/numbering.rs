//! Outline section numbering
//!
//! Driven by walk events: entering a children container pushes a fresh
//! `(headings, subs)` counter, leaving it pops. A heading bumps the heading
//! count of the innermost level and clears its sub count; any other binding
//! bumps the sub count.
//!
//! Labels join the heading counts of all open levels with `.` and suffix the
//! innermost non-zero sub count with `-`. A nested level that has seen no
//! heading contributes only its suffix, so a leaf directly under heading 1
//! reads `1-1`. Labels are for display only and are provisional; they are
//! not the server's own numbering.

use crate::error::{Result, StructureError};
use crate::walk::WalkEvent;
use std::fmt;

/// Counter pair of one open level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelCounter {
    pub headings: u32,
    pub subs: u32,
}

/// Rendered section label such as `2.1-3`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SectionLabel(String);

impl SectionLabel {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stateful numbering engine
#[derive(Debug, Clone, Default)]
pub struct SectionNumbering {
    levels: Vec<LevelCounter>,
}

impl SectionNumbering {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open levels
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Open counters, outermost first
    #[inline]
    #[must_use]
    pub fn levels(&self) -> &[LevelCounter] {
        &self.levels
    }

    pub fn enter_level(&mut self) {
        self.levels.push(LevelCounter::default());
    }

    pub fn exit_level(&mut self) -> Result<()> {
        self.levels
            .pop()
            .map(|_| ())
            .ok_or(StructureError::UnbalancedWalk("level closed but none open"))
    }

    /// Count a binding at the innermost level and return its label
    pub fn visit(&mut self, is_heading: bool) -> Result<SectionLabel> {
        let level = self
            .levels
            .last_mut()
            .ok_or(StructureError::UnbalancedWalk("binding visited outside any level"))?;
        if is_heading {
            level.headings += 1;
            level.subs = 0;
        } else {
            level.subs += 1;
        }
        Ok(self.label())
    }

    /// Feed one walk event; node events yield their label
    pub fn observe(&mut self, event: &WalkEvent<'_>) -> Result<Option<SectionLabel>> {
        match event {
            WalkEvent::EnterLevel { .. } => {
                self.enter_level();
                Ok(None)
            }
            WalkEvent::ExitLevel { .. } => {
                self.exit_level()?;
                Ok(None)
            }
            WalkEvent::Node { binding, .. } => self.visit(binding.is_heading).map(Some),
        }
    }

    /// Label of the current position
    #[must_use]
    pub fn label(&self) -> SectionLabel {
        SectionLabel(render(&self.levels))
    }
}

/// Render counters, outermost first
#[must_use]
pub fn render(levels: &[LevelCounter]) -> String {
    let mut out = String::new();
    for (i, level) in levels.iter().enumerate() {
        let collapsed = i > 0 && level.headings == 0;
        if !collapsed {
            if i > 0 {
                out.push('.');
            }
            out.push_str(&level.headings.to_string());
        }
        if level.subs != 0 {
            out.push('-');
            out.push_str(&level.subs.to_string());
        }
    }
    out
}
