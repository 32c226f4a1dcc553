//! Viscosity presets and their controller gains.

/// Controller gains. `ti` is the integral time in seconds; 0 disables
/// integral action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    pub kp: f32,
    pub ti: f32,
    pub kd: f32,
}

impl Gains {
    pub const fn new(kp: f32, ti: f32, kd: f32) -> Self {
        Self { kp, ti, kd }
    }
}

impl Default for Gains {
    fn default() -> Self {
        Self::new(1.0, 5.0, 0.0)
    }
}

/// Selectable honey profile. Codes 0–3 match the order below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViscosityProfile {
    UserDefined,
    Low,
    #[default]
    Medium,
    High,
}

impl ViscosityProfile {
    pub const ALL: [ViscosityProfile; 4] = [
        ViscosityProfile::UserDefined,
        ViscosityProfile::Low,
        ViscosityProfile::Medium,
        ViscosityProfile::High,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// Factory gains; `None` for the user-defined profile.
    pub fn factory_gains(self) -> Option<Gains> {
        match self {
            ViscosityProfile::UserDefined => None,
            ViscosityProfile::Low => Some(Gains::new(0.6, 4.0, 0.0)),
            ViscosityProfile::Medium => Some(Gains::new(1.0, 6.0, 0.05)),
            // Thick honey: no integral action, derivative damping only
            ViscosityProfile::High => Some(Gains::new(1.5, 0.0, 0.1)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ViscosityProfile::UserDefined => "user_defined",
            ViscosityProfile::Low => "low",
            ViscosityProfile::Medium => "medium",
            ViscosityProfile::High => "high",
        }
    }
}

impl std::str::FromStr for ViscosityProfile {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if let Ok(code) = s.parse::<u8>() {
            return Self::from_code(code).ok_or(());
        }
        Self::ALL
            .into_iter()
            .find(|p| p.name() == s || (s == "user" && *p == ViscosityProfile::UserDefined))
            .ok_or(())
    }
}

/// Gains per profile with exactly one active entry.
///
/// Every entry can be tuned at runtime; selecting a factory profile restores
/// its constants.
#[derive(Debug, Clone, PartialEq)]
pub struct GainTable {
    entries: [Gains; 4],
    active: ViscosityProfile,
}

impl GainTable {
    pub fn new(user: Gains, active: ViscosityProfile) -> Self {
        let mut entries = [user; 4];
        for p in ViscosityProfile::ALL {
            if let Some(g) = p.factory_gains() {
                entries[usize::from(p.code())] = g;
            }
        }
        Self { entries, active }
    }

    pub fn active(&self) -> ViscosityProfile {
        self.active
    }

    pub fn active_gains(&self) -> Gains {
        self.entries[usize::from(self.active.code())]
    }

    pub fn user_gains(&self) -> Gains {
        self.entries[usize::from(ViscosityProfile::UserDefined.code())]
    }

    pub fn select(&mut self, profile: ViscosityProfile) {
        if let Some(g) = profile.factory_gains() {
            self.entries[usize::from(profile.code())] = g;
        }
        self.active = profile;
    }

    /// Tune the active profile in place.
    pub fn update_active(&mut self, f: impl FnOnce(&mut Gains)) {
        f(&mut self.entries[usize::from(self.active.code())]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for p in ViscosityProfile::ALL {
            assert_eq!(ViscosityProfile::from_code(p.code()), Some(p));
        }
        assert_eq!(ViscosityProfile::from_code(4), None);
    }

    #[test]
    fn parses_names_and_codes() {
        assert_eq!("high".parse(), Ok(ViscosityProfile::High));
        assert_eq!("0".parse(), Ok(ViscosityProfile::UserDefined));
        assert_eq!("User".parse(), Ok(ViscosityProfile::UserDefined));
        assert!("runny".parse::<ViscosityProfile>().is_err());
    }

    #[test]
    fn selecting_factory_profile_restores_constants() {
        let mut t = GainTable::new(Gains::default(), ViscosityProfile::Low);
        t.update_active(|g| g.kp = 9.0);
        assert_eq!(t.active_gains().kp, 9.0);
        t.select(ViscosityProfile::Medium);
        t.select(ViscosityProfile::Low);
        assert_eq!(t.active_gains(), Gains::new(0.6, 4.0, 0.0));
    }

    #[test]
    fn user_profile_keeps_edits() {
        let mut t = GainTable::new(Gains::new(2.0, 3.0, 0.1), ViscosityProfile::UserDefined);
        t.update_active(|g| g.ti = 8.0);
        t.select(ViscosityProfile::High);
        t.select(ViscosityProfile::UserDefined);
        assert_eq!(t.active_gains(), Gains::new(2.0, 8.0, 0.1));
        assert_eq!(t.user_gains(), t.active_gains());
    }
}
