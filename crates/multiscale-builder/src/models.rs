//! Model availability: confirm neuron models exist in the kernel, installing
//! and compiling extension modules when they do not.

use crate::backend::SimulationKernel;
use multiscale_core::{ExtensionConfig, MultiscaleError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// How a model became available
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ModelSource {
    /// Shipped with the kernel
    Builtin,
    /// Provided by an already built extension module
    Installed(String),
    /// Provided by an extension module compiled during this build
    Compiled(String),
}

/// Extension module expected to provide `model`
pub fn module_name(model: &str) -> String {
    format!("{}module", model)
}

/// Install a module, compiling it when the install fails.
///
/// Each compilation after the first is forced. Returns whether the module had
/// to be compiled. Compilation failures are returned as they are; a module
/// that still cannot be installed after every attempt yields the last install
/// error.
pub fn install_module<K>(kernel: &mut K, module: &str, extensions: &ExtensionConfig) -> Result<bool>
where
    K: SimulationKernel + ?Sized,
{
    let mut last = match kernel.install_module(module) {
        Ok(()) => return Ok(false),
        Err(e) => e,
    };
    for attempt in 0..extensions.max_compile_attempts.max(1) {
        info!(
            target: "multiscale::models",
            "Module {} not installed ({}), compiling it (attempt {})", module, last, attempt + 1
        );
        kernel.compile_module(module, attempt > 0)?;
        match kernel.install_module(module) {
            Ok(()) => return Ok(true),
            Err(e) => {
                warn!(target: "multiscale::models", "Installing compiled module {} failed: {}", module, e);
                last = e;
            }
        }
    }
    Err(last)
}

/// Make a neuron model available in the kernel
pub fn ensure_model<K>(kernel: &mut K, model: &str, extensions: &ExtensionConfig) -> Result<ModelSource>
where
    K: SimulationKernel + ?Sized,
{
    if kernel.has_model(model) {
        return Ok(ModelSource::Builtin);
    }
    let module = module_name(model);
    let compiled = install_module(kernel, &module, extensions)?;
    if !kernel.has_model(model) {
        return Err(MultiscaleError::UnknownModel(model.to_string()));
    }
    info!(target: "multiscale::models", "Model {} provided by module {}", model, module);
    Ok(if compiled {
        ModelSource::Compiled(module)
    } else {
        ModelSource::Installed(module)
    })
}

/// Confirm every model once, in the given order
pub fn confirm_models<K>(
    kernel: &mut K,
    models: &[String],
    extensions: &ExtensionConfig,
) -> Result<BTreeMap<String, ModelSource>>
where
    K: SimulationKernel + ?Sized,
{
    let mut sources = BTreeMap::new();
    for model in models {
        if sources.contains_key(model) {
            continue;
        }
        let source = ensure_model(kernel, model, extensions)?;
        sources.insert(model.clone(), source);
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;

    #[test]
    fn test_builtin_model() {
        let mut backend = MockBackend::new();
        let source = ensure_model(&mut backend, "iaf_cond_alpha", &ExtensionConfig::default()).unwrap();
        assert_eq!(source, ModelSource::Builtin);
        assert!(backend.install_calls.is_empty());
    }

    #[test]
    fn test_prebuilt_module() {
        let mut backend = MockBackend::new().with_module("izhikevich_hamker", true);
        let source = ensure_model(&mut backend, "izhikevich_hamker", &ExtensionConfig::default()).unwrap();
        assert_eq!(source, ModelSource::Installed("izhikevich_hamkermodule".into()));
        assert!(backend.compile_calls.is_empty());
    }

    #[test]
    fn test_compile_then_install() {
        let mut backend = MockBackend::new().with_module("izhikevich_hamker", false);
        let source = ensure_model(&mut backend, "izhikevich_hamker", &ExtensionConfig::default()).unwrap();
        assert_eq!(source, ModelSource::Compiled("izhikevich_hamkermodule".into()));
        assert_eq!(backend.install_calls.len(), 2);
        assert_eq!(backend.compile_calls, vec![("izhikevich_hamkermodule".to_string(), false)]);
    }

    #[test]
    fn test_compile_failure_is_distinct() {
        let mut backend = MockBackend::new().with_module("izhikevich_hamker", false);
        backend.compile_fails = true;
        let err = ensure_model(&mut backend, "izhikevich_hamker", &ExtensionConfig::default()).unwrap_err();
        assert!(matches!(err, MultiscaleError::ModuleCompile { .. }));
    }

    #[test]
    fn test_forced_retries() {
        let mut backend = MockBackend::new().with_module("izhikevich_hamker", false);
        backend.broken_installs = 1;
        let extensions = ExtensionConfig {
            max_compile_attempts: 3,
            ..ExtensionConfig::default()
        };
        ensure_model(&mut backend, "izhikevich_hamker", &extensions).unwrap();
        assert_eq!(
            backend.compile_calls.iter().map(|(_, force)| *force).collect::<Vec<_>>(),
            vec![false, true]
        );

        let mut backend = MockBackend::new().with_module("izhikevich_hamker", false);
        backend.broken_installs = 5;
        let err = ensure_model(&mut backend, "izhikevich_hamker", &extensions).unwrap_err();
        assert!(matches!(err, MultiscaleError::ModuleInstall { .. }));
        assert_eq!(backend.compile_calls.len(), 3);
    }

    #[test]
    fn test_unknown_model() {
        let mut backend = MockBackend::new();
        let err = ensure_model(&mut backend, "no_such_model", &ExtensionConfig::default()).unwrap_err();
        assert!(matches!(err, MultiscaleError::ModuleCompile { .. }));
    }

    #[test]
    fn test_confirm_models_once() {
        let mut backend = MockBackend::new().with_module("izhikevich_hamker", true);
        let models = vec![
            "izhikevich_hamker".to_string(),
            "iaf_cond_alpha".to_string(),
            "izhikevich_hamker".to_string(),
        ];
        let sources = confirm_models(&mut backend, &models, &ExtensionConfig::default()).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(backend.install_calls.len(), 1);
    }
}
