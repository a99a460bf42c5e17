use crate::error::{Result, YapError};
use crate::manifest::{Manifest, ServiceDescriptor};
use crate::paths::detect_current_app;
use std::path::PathBuf;

/// What to do when neither `--all` nor names were given.
#[derive(Debug, Clone)]
pub enum Fallback {
    /// Every application in the manifest
    AllApplications,
    /// The application containing `cwd`, else the first application
    CurrentDir { root: PathBuf, cwd: PathBuf },
    /// Refuse: a target must be named
    Required,
}

/// Applications an action will run against.
#[derive(Debug, Clone, Default)]
pub struct Targets {
    pub services: Vec<ServiceDescriptor>,
    /// Requested names that are unknown or not applications
    pub skipped: Vec<String>,
    /// No target was named and the first application was picked
    pub defaulted: bool,
}

impl Targets {
    pub fn names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name.clone()).collect()
    }
}

/// Resolve requested names against the manifest.
///
/// Unknown names and libraries are skipped; the call fails only when no
/// runnable application remains.
pub fn resolve(manifest: &Manifest, names: &[String], all: bool, fallback: Fallback) -> Result<Targets> {
    let applications = manifest.applications();
    let available = || YapError::NoTargets(manifest.application_names());

    if all {
        if applications.is_empty() {
            return Err(available());
        }
        return Ok(Targets {
            services: applications,
            ..Targets::default()
        });
    }

    if names.is_empty() {
        return match fallback {
            Fallback::AllApplications if !applications.is_empty() => Ok(Targets {
                services: applications,
                ..Targets::default()
            }),
            Fallback::CurrentDir { root, cwd } => {
                let detected = detect_current_app(&root, &cwd)
                    .and_then(|name| applications.iter().find(|s| s.name == name).cloned());
                match detected {
                    Some(service) => Ok(Targets {
                        services: vec![service],
                        ..Targets::default()
                    }),
                    None => applications
                        .first()
                        .cloned()
                        .map(|service| Targets {
                            services: vec![service],
                            defaulted: true,
                            ..Targets::default()
                        })
                        .ok_or_else(available),
                }
            }
            _ => Err(available()),
        };
    }

    let validation = manifest.validate(names);
    let mut targets = Targets {
        skipped: validation.invalid,
        ..Targets::default()
    };
    for name in validation.valid {
        match manifest.get(&name) {
            Some(service) if service.is_application() => {
                if !targets.services.iter().any(|s| s.name == name) {
                    targets.services.push(service.clone());
                }
            }
            _ => targets.skipped.push(name),
        }
    }

    if targets.services.is_empty() {
        return Err(available());
    }
    Ok(targets)
}
