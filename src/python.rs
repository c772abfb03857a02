//! Python bindings, built with the `python` feature

use crate::config::EngineConfig;
use crate::core::engine::RecoveryEngine;
use crate::core::indices;
use crate::types::{parse_date, RegrowthError};
use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2};
use pyo3::exceptions::{PyIOError, PyValueError};
use pyo3::prelude::*;

impl From<RegrowthError> for PyErr {
    fn from(err: RegrowthError) -> PyErr {
        match err {
            RegrowthError::Io(e) => PyIOError::new_err(e.to_string()),
            other => PyValueError::new_err(other.to_string()),
        }
    }
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyRecoveryEngine>()?;
    m.add_function(wrap_pyfunction!(ndvi, m)?)?;
    m.add_function(wrap_pyfunction!(ndwi, m)?)?;
    Ok(())
}

/// Python wrapper for RecoveryEngine
#[pyclass(name = "RecoveryEngine")]
struct PyRecoveryEngine {
    inner: RecoveryEngine,
}

#[pymethods]
impl PyRecoveryEngine {
    #[new]
    #[pyo3(signature = (config_json=None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => EngineConfig::from_json_str(json)?,
            None => EngineConfig::default(),
        };
        Ok(PyRecoveryEngine {
            inner: RecoveryEngine::new(config)?,
        })
    }

    #[getter]
    fn variant(&self) -> String {
        self.inner.variant().to_string()
    }

    /// Simulate and analyse a flood event, returning the report as JSON
    fn process_flood_event(&self, flood_date: &str, num_time_steps: usize) -> PyResult<String> {
        let date = parse_date(flood_date)?;
        let report = self.inner.process_flood_event(date, num_time_steps)?;
        Ok(report.to_json()?)
    }

    /// Dashboard row for a simulated flood event, as JSON
    fn summarize_flood_event(&self, flood_date: &str, num_time_steps: usize) -> PyResult<String> {
        let date = parse_date(flood_date)?;
        let summary = self.inner.process_flood_event(date, num_time_steps)?.summary();
        serde_json::to_string(&summary).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn __repr__(&self) -> String {
        format!("RecoveryEngine(variant='{}')", self.inner.variant())
    }
}

#[pyfunction]
fn ndvi<'py>(
    py: Python<'py>,
    red: PyReadonlyArray2<'py, f64>,
    nir: PyReadonlyArray2<'py, f64>,
) -> PyResult<&'py PyArray2<f64>> {
    let result = indices::ndvi(&red.as_array().to_owned(), &nir.as_array().to_owned())?;
    Ok(result.into_pyarray(py))
}

#[pyfunction]
fn ndwi<'py>(
    py: Python<'py>,
    green: PyReadonlyArray2<'py, f64>,
    nir: PyReadonlyArray2<'py, f64>,
) -> PyResult<&'py PyArray2<f64>> {
    let result = indices::ndwi(&green.as_array().to_owned(), &nir.as_array().to_owned())?;
    Ok(result.into_pyarray(py))
}
