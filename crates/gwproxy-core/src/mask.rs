//! Surface selection
//!
//! The user picks target surfaces with free text: blank or `A` for all,
//! otherwise any combination of the digits `1`-`4`.
//!
//! | Digit | Surface |
//! |-------|---------|
//! | 1 | OS proxy settings |
//! | 2 | Shell profile |
//! | 3 | Editor settings |
//! | 4 | Package manager config |

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Set of surfaces to act on
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EnvironmentMask: u8 {
        const SYSTEM          = 1 << 0;
        const SHELL_PROFILE   = 1 << 1;
        const EDITOR          = 1 << 2;
        const PACKAGE_MANAGER = 1 << 3;
    }
}

impl EnvironmentMask {
    /// Parse a free-form selection.
    ///
    /// Unknown characters are ignored; an input with no recognised digit
    /// yields the empty mask, which callers treat as "ask again".
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() || input.eq_ignore_ascii_case("a") {
            return Self::all();
        }

        input
            .chars()
            .filter_map(SurfaceKind::from_digit)
            .fold(Self::empty(), |mask, kind| mask | kind.flag())
    }

    /// Selected surfaces in application order
    pub fn surfaces(self) -> impl Iterator<Item = SurfaceKind> {
        SurfaceKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(kind.flag()))
    }
}

/// One configuration surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SurfaceKind {
    System,
    ShellProfile,
    Editor,
    PackageManager,
}

impl SurfaceKind {
    /// All surfaces in application order
    pub const ALL: [SurfaceKind; 4] = [
        SurfaceKind::System,
        SurfaceKind::ShellProfile,
        SurfaceKind::Editor,
        SurfaceKind::PackageManager,
    ];

    /// Flag for this surface
    pub fn flag(&self) -> EnvironmentMask {
        match self {
            SurfaceKind::System => EnvironmentMask::SYSTEM,
            SurfaceKind::ShellProfile => EnvironmentMask::SHELL_PROFILE,
            SurfaceKind::Editor => EnvironmentMask::EDITOR,
            SurfaceKind::PackageManager => EnvironmentMask::PACKAGE_MANAGER,
        }
    }

    /// Selection digit
    pub fn digit(&self) -> char {
        match self {
            SurfaceKind::System => '1',
            SurfaceKind::ShellProfile => '2',
            SurfaceKind::Editor => '3',
            SurfaceKind::PackageManager => '4',
        }
    }

    fn from_digit(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.digit() == c)
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            SurfaceKind::System => "System",
            SurfaceKind::ShellProfile => "Shell profile",
            SurfaceKind::Editor => "Editor",
            SurfaceKind::PackageManager => "Package manager",
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
