//! Neutron coherent scattering lengths and atomic masses.
//!
//! Values follow the NIST neutron scattering length tables (bound coherent
//! lengths in fm, natural isotopic abundance) and IUPAC standard atomic
//! weights. Hydrogen isotopes are addressable as `D` and `T`.

use num_complex::Complex64;
use std::fmt::Debug;

/// Element-data lookup consumed by density- and formula-derived materials.
pub trait ElementData: Debug {
    /// Bound coherent scattering length in fm; the imaginary part carries
    /// absorption.
    fn scattering_length(&self, symbol: &str) -> Option<Complex64>;

    /// Standard atomic mass in g/mol.
    fn atomic_mass(&self, symbol: &str) -> Option<f64>;
}

#[derive(Debug, Clone, Copy)]
struct ElementRow {
    symbol: &'static str,
    b_real: f64,
    b_imag: f64,
    mass: f64,
}

const fn row(symbol: &'static str, b_real: f64, b_imag: f64, mass: f64) -> ElementRow {
    ElementRow {
        symbol,
        b_real,
        b_imag,
        mass,
    }
}

const ELEMENT_ROWS: [ElementRow; 50] = [
    row("H", -3.739, 0.0, 1.008),
    row("D", 6.671, 0.0, 2.014),
    row("T", 4.792, 0.0, 3.016),
    row("He", 3.26, 0.0, 4.0026),
    row("Li", -1.90, 0.0, 6.94),
    row("Be", 7.79, 0.0, 9.0122),
    row("B", 5.30, -0.213, 10.81),
    row("C", 6.646, 0.0, 12.011),
    row("N", 9.36, 0.0, 14.007),
    row("O", 5.803, 0.0, 15.999),
    row("F", 5.654, 0.0, 18.998),
    row("Ne", 4.566, 0.0, 20.180),
    row("Na", 3.63, 0.0, 22.990),
    row("Mg", 5.375, 0.0, 24.305),
    row("Al", 3.449, 0.0, 26.982),
    row("Si", 4.1491, 0.0, 28.085),
    row("P", 5.13, 0.0, 30.974),
    row("S", 2.847, 0.0, 32.06),
    row("Cl", 9.577, 0.0, 35.45),
    row("Ar", 1.909, 0.0, 39.948),
    row("K", 3.67, 0.0, 39.098),
    row("Ca", 4.70, 0.0, 40.078),
    row("Ti", -3.438, 0.0, 47.867),
    row("V", -0.3824, 0.0, 50.942),
    row("Cr", 3.635, 0.0, 51.996),
    row("Mn", -3.73, 0.0, 54.938),
    row("Fe", 9.45, 0.0, 55.845),
    row("Co", 2.49, 0.0, 58.933),
    row("Ni", 10.3, 0.0, 58.693),
    row("Cu", 7.718, 0.0, 63.546),
    row("Zn", 5.680, 0.0, 65.38),
    row("Ga", 7.288, 0.0, 69.723),
    row("Ge", 8.185, 0.0, 72.630),
    row("Sr", 7.02, 0.0, 87.62),
    row("Y", 7.75, 0.0, 88.906),
    row("Zr", 7.16, 0.0, 91.224),
    row("Nb", 7.054, 0.0, 92.906),
    row("Mo", 6.715, 0.0, 95.95),
    row("Pd", 5.91, 0.0, 106.42),
    row("Ag", 5.922, 0.0, 107.868),
    row("Cd", 4.87, -0.70, 112.414),
    row("In", 4.065, -0.0539, 114.818),
    row("Sn", 6.225, 0.0, 118.710),
    row("Ba", 5.07, 0.0, 137.327),
    row("La", 8.24, 0.0, 138.905),
    row("Gd", 6.5, -13.82, 157.25),
    row("Ta", 6.91, 0.0, 180.948),
    row("W", 4.86, 0.0, 183.84),
    row("Pt", 9.60, 0.0, 195.084),
    row("Au", 7.63, 0.0, 196.967),
];

/// Built-in table covering the elements commonly met in reflectometry samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutronScatteringTable;

impl NeutronScatteringTable {
    fn find(symbol: &str) -> Option<&'static ElementRow> {
        ELEMENT_ROWS
            .iter()
            .find(|candidate| candidate.symbol == symbol.trim())
    }

    pub fn symbols() -> impl Iterator<Item = &'static str> {
        ELEMENT_ROWS.iter().map(|candidate| candidate.symbol)
    }
}

impl ElementData for NeutronScatteringTable {
    fn scattering_length(&self, symbol: &str) -> Option<Complex64> {
        Self::find(symbol).map(|element| Complex64::new(element.b_real, element.b_imag))
    }

    fn atomic_mass(&self, symbol: &str) -> Option<f64> {
        Self::find(symbol).map(|element| element.mass)
    }
}

#[cfg(test)]
mod tests {
    use super::{ElementData, NeutronScatteringTable};

    #[test]
    fn lookup_is_case_sensitive_and_trims() {
        let table = NeutronScatteringTable;
        assert!(table.scattering_length("Si").is_some());
        assert!(table.scattering_length(" Si ").is_some());
        assert!(table.scattering_length("SI").is_none());
        assert!(table.atomic_mass("Xx").is_none());
    }

    #[test]
    fn hydrogen_isotopes_have_opposite_sign_lengths() {
        let table = NeutronScatteringTable;
        let hydrogen = table.scattering_length("H").expect("hydrogen row");
        let deuterium = table.scattering_length("D").expect("deuterium row");
        assert!(hydrogen.re < 0.0);
        assert!(deuterium.re > 0.0);
    }

    #[test]
    fn absorbing_elements_carry_imaginary_lengths() {
        let table = NeutronScatteringTable;
        let boron = table.scattering_length("B").expect("boron row");
        assert!(boron.im < 0.0);
        let silicon = table.scattering_length("Si").expect("silicon row");
        assert_eq!(silicon.im, 0.0);
    }

    #[test]
    fn symbols_are_unique() {
        let symbols: Vec<&str> = NeutronScatteringTable::symbols().collect();
        for (index, symbol) in symbols.iter().enumerate() {
            assert!(
                !symbols[index + 1..].contains(symbol),
                "duplicate symbol {}",
                symbol
            );
        }
    }
}
