//! Instructor rate resolution
//!
//! Effective hourly rate = base rate for the kind of work, times the
//! employee multiplier when the instructor is an employee.

use crate::config::settings::Settings;
use crate::error::CycleResult;
use crate::models::{EmploymentType, Instructor, Money, RateCard, RateKind};

/// Resolves effective hourly rates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateResolver {
    employee_multiplier: f64,
}

impl Default for RateResolver {
    fn default() -> Self {
        Self {
            employee_multiplier: 1.3,
        }
    }
}

impl RateResolver {
    pub fn new(employee_multiplier: f64) -> Self {
        Self {
            employee_multiplier,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.employee_multiplier)
    }

    pub fn employee_multiplier(&self) -> f64 {
        self.employee_multiplier
    }

    /// Multiplier for an employment type
    pub fn multiplier(&self, employment: EmploymentType) -> f64 {
        match employment {
            EmploymentType::Employee => self.employee_multiplier,
            EmploymentType::Freelancer => 1.0,
        }
    }

    /// Effective hourly rate, rounded to the cent
    pub fn resolve(&self, card: &RateCard, kind: RateKind, employment: EmploymentType) -> Money {
        card.base_rate(kind).scale(self.multiplier(employment))
    }

    /// Like [`RateResolver::resolve`], with the kind given by name
    ///
    /// Fails with a validation error for an unknown kind.
    pub fn resolve_named(
        &self,
        card: &RateCard,
        kind: &str,
        employment: EmploymentType,
    ) -> CycleResult<Money> {
        Ok(self.resolve(card, kind.parse()?, employment))
    }

    /// Cost of `hours` of an instructor's time
    ///
    /// Computed as base × multiplier × hours in one step so that intermediate
    /// cent rounding does not leak into the result.
    pub fn cost(&self, instructor: &Instructor, kind: RateKind, hours: f64) -> Money {
        instructor
            .rates
            .base_rate(kind)
            .scale(self.multiplier(instructor.employment_type) * hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card() -> RateCard {
        RateCard::new(
            Money::from_units(100),
            Money::from_units(80),
            Money::from_units(150),
        )
    }

    #[test]
    fn test_freelancer_gets_base_rate() {
        let resolver = RateResolver::default();
        assert_eq!(
            resolver.resolve(&card(), RateKind::Online, EmploymentType::Freelancer),
            Money::from_units(80)
        );
    }

    #[test]
    fn test_employee_multiplier() {
        let resolver = RateResolver::default();
        assert_eq!(
            resolver.resolve(&card(), RateKind::Frontal, EmploymentType::Employee),
            Money::from_units(130)
        );
        assert_eq!(
            resolver.resolve(&card(), RateKind::Preparation, EmploymentType::Employee),
            Money::from_units(195)
        );
    }

    #[test]
    fn test_unknown_kind_is_validation_error() {
        let resolver = RateResolver::default();
        let err = resolver
            .resolve_named(&card(), "weekend", EmploymentType::Freelancer)
            .unwrap_err();
        assert!(err.is_validation());

        assert_eq!(
            resolver
                .resolve_named(&card(), "private_lesson", EmploymentType::Freelancer)
                .unwrap(),
            Money::from_units(150)
        );
    }

    #[test]
    fn test_cost_for_hours() {
        let resolver = RateResolver::default();
        let instructor = Instructor::new("Dana", card(), EmploymentType::Employee);
        assert_eq!(
            resolver.cost(&instructor, RateKind::Frontal, 1.5),
            Money::from_units(195)
        );
    }
}
