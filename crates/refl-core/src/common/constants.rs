//! Physical constants and unit conversions shared by the material family.

/// Avogadro's number scaled so that `density [g/cm^3] * b [Å] / M [g/mol]`
/// lands in units of 1e-6 Å^-2.
pub const SLD_DENSITY_FACTOR: f64 = 0.602_214_076e6;

/// Scattering lengths are tabulated in femtometres; SLD arithmetic uses Å.
pub const FM_TO_ANGSTROM: f64 = 1.0e-5;

/// Molecular-film SLD scale: `b [Å] / (thickness [Å] * area [Å^2])` in 1e-6 Å^-2.
pub const MOLECULE_SLD_SCALE: f64 = 1.0e6;

pub const SLD_UNIT: &str = "1/angstrom^2";
pub const LENGTH_UNIT: &str = "angstrom";
pub const AREA_UNIT: &str = "angstrom^2";
pub const DENSITY_UNIT: &str = "gram/centimeter^3";
pub const MASS_UNIT: &str = "gram/mole";
pub const DIMENSIONLESS: &str = "dimensionless";

#[cfg(test)]
mod tests {
    use super::{FM_TO_ANGSTROM, MOLECULE_SLD_SCALE, SLD_DENSITY_FACTOR};

    #[test]
    fn silicon_sld_from_density_matches_reference() {
        let b_silicon = 4.1491 * FM_TO_ANGSTROM;
        let sld = SLD_DENSITY_FACTOR * 2.33 * b_silicon / 28.085;
        assert!((sld - 2.0729).abs() < 1.0e-3, "silicon sld was {}", sld);
    }

    #[test]
    fn scales_are_finite_and_positive() {
        for value in [SLD_DENSITY_FACTOR, FM_TO_ANGSTROM, MOLECULE_SLD_SCALE] {
            assert!(value.is_finite());
            assert!(value > 0.0);
        }
    }
}
