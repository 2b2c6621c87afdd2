//! Python bindings via PyO3.
//!
//! ```python
//! import chromatin_lattice as cl
//!
//! sim = cl.Microemulsion(200, 200, omega=0.25, seed=7, n_workers=8)
//! sim.fill_randomly(0.3)
//! sim.pi_shaped_chains()
//! for _ in range(100):
//!     sim.perform_random_swaps(25)
//!     counts = sim.perform_chemical_reactions()
//! levels = sim.render_levels()   # numpy uint8, shape (rows, columns)
//! ```

use std::collections::BTreeSet;

use numpy::PyArray2;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::engine::{Rate, RateConstants};
use crate::error::LatticeError;
use crate::lattice::{ChainId, ChemicalState, Displacement, Flags, Lattice, LatticeInitializer, Species};
use crate::microemulsion::{Microemulsion, MicroemulsionConfig};

impl From<LatticeError> for PyErr {
    fn from(err: LatticeError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

/// Chains are laid out as inactive, transcribable chromatin.
fn chain_state() -> (ChemicalState, Flags) {
    (ChemicalState::inactive_chromatin(), Flags::new(true, false))
}

/// Python wrapper for [`Microemulsion`].
#[pyclass(name = "Microemulsion")]
pub struct PyMicroemulsion {
    inner: Microemulsion,
}

impl PyMicroemulsion {
    fn initializer(&mut self) -> LatticeInitializer<'_> {
        LatticeInitializer::new(self.inner.lattice_mut())
    }
}

#[pymethods]
impl PyMicroemulsion {
    /// Create a simulation over a `columns x rows` lattice of inactive
    /// chromatin.
    ///
    /// # Arguments
    /// * `columns` - Interior width
    /// * `rows` - Interior height
    /// * `omega` - Contact energy of a disfavored pair
    /// * `sticky_boundary` - Pin inactive chromatin on the outer interior ring
    /// * `seed` - Master seed; `None` seeds every stream from entropy
    /// * `n_workers` - Swap worker threads; `None` uses rayon's default
    ///
    /// # Returns
    /// * The simulation; raises `ValueError` for an unusable lattice size
    #[new]
    #[pyo3(signature = (columns, rows, omega=0.25, sticky_boundary=false, seed=None, n_workers=None))]
    fn new(
        columns: usize,
        rows: usize,
        omega: f64,
        sticky_boundary: bool,
        seed: Option<u64>,
        n_workers: Option<usize>,
    ) -> PyResult<Self> {
        let lattice = Lattice::new(columns, rows)?;
        let config = MicroemulsionConfig {
            omega,
            sticky_boundary,
            rates: RateConstants::default(),
            seed,
            n_workers,
        };
        Ok(Self {
            inner: Microemulsion::new(lattice, config)?,
        })
    }

    /// Scatter inactive RBP over `ratio` of the chain-free interior.
    fn fill_randomly(&mut self, ratio: f64) -> usize {
        self.inner
            .fill_randomly(ratio, ChemicalState::inactive_rbp(), Flags::default())
    }

    #[pyo3(signature = (offset_from_center=0))]
    fn single_chain(&mut self, offset_from_center: i32) -> PyResult<Vec<ChainId>> {
        let (chemical, flags) = chain_state();
        let ids = self.initializer().single_chain(offset_from_center, chemical, flags)?;
        Ok(ids.into_iter().collect())
    }

    fn parallel_chains(&mut self, distance: i32) -> PyResult<Vec<ChainId>> {
        let (chemical, flags) = chain_state();
        let ids = self.initializer().parallel_chains(distance, chemical, flags)?;
        Ok(ids.into_iter().collect())
    }

    #[pyo3(signature = (x_offset=0, y_offset=0))]
    fn orthogonal_chains(&mut self, x_offset: i32, y_offset: i32) -> PyResult<Vec<ChainId>> {
        let (chemical, flags) = chain_state();
        let ids = self
            .initializer()
            .orthogonal_chains(x_offset, y_offset, chemical, flags)?;
        Ok(ids.into_iter().collect())
    }

    fn pi_shaped_chains(&mut self) -> PyResult<Vec<ChainId>> {
        let (chemical, flags) = chain_state();
        let ids = self.initializer().pi_shaped_chains(chemical, flags)?;
        Ok(ids.into_iter().collect())
    }

    /// Walk `(dx, dy)` steps from `(column, row)`; returns the chain ids and
    /// the end position.
    fn chain_from_steps(
        &mut self,
        column: i32,
        row: i32,
        steps: Vec<(i32, i32)>,
    ) -> PyResult<(Vec<ChainId>, (i32, i32))> {
        let (chemical, flags) = chain_state();
        let steps: Vec<Displacement> = steps
            .into_iter()
            .map(|(dx, dy)| Displacement::new(dx, dy))
            .collect();
        let (ids, end) = self
            .initializer()
            .chain_from_steps((column, row), &steps, chemical, flags)?;
        Ok((ids.into_iter().collect(), end))
    }

    fn perform_random_swap(&mut self) -> u64 {
        self.inner.perform_random_swap()
    }

    /// Run `rounds` parallel color rounds with the GIL released.
    ///
    /// # Returns
    /// * Number of accepted swaps
    fn perform_random_swaps(&mut self, py: Python<'_>, rounds: u64) -> u64 {
        py.allow_threads(|| self.inner.perform_random_swaps(rounds))
    }

    /// Run both reaction passes; returns the per-kind change counts.
    fn perform_chemical_reactions(&mut self, py: Python<'_>) -> PyResult<PyObject> {
        let counts = self.inner.perform_chemical_reactions();
        let result = PyDict::new(py);
        result.set_item("activity_switches", counts.activity_switches)?;
        result.set_item("transcribability_switches", counts.transcribability_switches)?;
        result.set_item("rna_produced", counts.rna_produced)?;
        result.set_item("rna_decayed", counts.rna_decayed)?;
        result.set_item("rna_transferred", counts.rna_transferred)?;
        result.set_item("rbp_deactivations", counts.rbp_deactivations)?;
        result.set_item("total", counts.total())?;
        Ok(result.into())
    }

    /// Set a rate constant by name (`kOn`, `kRnaPlus`, ...).
    fn set_rate(&mut self, name: &str, value: f64) -> PyResult<()> {
        let rate = Rate::from_name(name)
            .ok_or_else(|| PyValueError::new_err(format!("unknown rate constant {name}")))?;
        self.inner.set_rate(rate, value);
        Ok(())
    }

    fn get_rate(&self, name: &str) -> PyResult<f64> {
        Rate::from_name(name)
            .map(|rate| self.inner.rates().get(rate))
            .ok_or_else(|| PyValueError::new_err(format!("unknown rate constant {name}")))
    }

    fn set_dt_chem(&mut self, dt_chem: f64) {
        self.inner.set_dt_chem(dt_chem);
    }

    fn set_omega(&mut self, omega: f64) {
        self.inner.set_omega(omega);
    }

    /// Names of the rates whose per-step probability reaches 1.
    fn tau_leap_violations(&self) -> Vec<String> {
        self.inner
            .rates()
            .tau_leap_violations()
            .into_iter()
            .map(|(rate, _)| rate.name().to_string())
            .collect()
    }

    fn enable_transcription_on_chains(&mut self, chain_ids: Vec<ChainId>) -> usize {
        let ids: BTreeSet<ChainId> = chain_ids.into_iter().collect();
        self.inner.enable_transcription_on_chains(&ids)
    }

    fn inhibit_transcription_on_chains(&mut self, chain_ids: Vec<ChainId>) -> usize {
        let ids: BTreeSet<ChainId> = chain_ids.into_iter().collect();
        self.inner.inhibit_transcription_on_chains(&ids)
    }

    #[getter]
    fn columns(&self) -> i32 {
        self.inner.lattice().last_column()
    }

    #[getter]
    fn rows(&self) -> i32 {
        self.inner.lattice().last_row()
    }

    fn rbp_count(&self) -> usize {
        self.inner.lattice().species_count(Species::Rbp)
    }

    fn total_rna(&self) -> u64 {
        self.inner.lattice().total_rna()
    }

    /// `(chain_id, position)` pairs whose sites are no longer adjacent.
    fn broken_chain_links(&self) -> Vec<(ChainId, u32)> {
        self.inner.lattice().broken_chain_links()
    }

    fn species_map<'py>(&self, py: Python<'py>) -> &'py PyArray2<u8> {
        PyArray2::from_owned_array(py, self.inner.lattice().species_map())
    }

    fn activity_map<'py>(&self, py: Python<'py>) -> &'py PyArray2<u8> {
        PyArray2::from_owned_array(py, self.inner.lattice().activity_map())
    }

    fn rna_map<'py>(&self, py: Python<'py>) -> &'py PyArray2<u32> {
        PyArray2::from_owned_array(py, self.inner.lattice().rna_map())
    }

    fn render_levels<'py>(&self, py: Python<'py>) -> &'py PyArray2<u8> {
        PyArray2::from_owned_array(py, self.inner.lattice().render_levels())
    }
}

/// Python module definition
#[pymodule]
fn chromatin_lattice(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyMicroemulsion>()?;
    Ok(())
}
