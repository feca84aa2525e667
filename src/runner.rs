// src/runner.rs
// ============================================================================
// RUNNER - Ejecución de programas externos
// ============================================================================
//
// convert.py y convert_safetensors.py son cajas negras. El orquestador solo
// construye la Invocation; quién la ejecuta lo decide el CommandRunner.
//
// ============================================================================

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::debug;

use crate::error::{QuantError, Result};

/// Un comando externo completo: programa, argumentos y working dir
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new(program: impl AsRef<OsStr>, cwd: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Par flag + valor (`-b 4.65`)
    pub fn flag(self, flag: &str, value: impl AsRef<OsStr>) -> Self {
        self.arg(flag).arg(value)
    }

    /// Nombre corto para mensajes de error
    pub fn display_name(&self) -> String {
        let program = self.program.to_string_lossy();
        match self.args.first() {
            Some(script) => format!("{} {}", program, script.to_string_lossy()),
            None => program.into_owned(),
        }
    }

    /// Argumentos como strings (para tests y logs)
    pub fn args_lossy(&self) -> Vec<String> {
        self.args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Ejecuta invocaciones de forma síncrona.
///
/// Ok solo si el proceso termina con exit status 0.
pub trait CommandRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<()>;
}

/// Runner real: lanza el proceso heredando stdout/stderr y espera
#[derive(Debug, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&mut self, invocation: &Invocation) -> Result<()> {
        debug!("exec (cwd={}): {}", invocation.cwd.display(), invocation);

        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .status()
            .map_err(|source| QuantError::Launch {
                program: invocation.display_name(),
                source,
            })?;

        if !status.success() {
            return Err(QuantError::ExitStatus {
                program: invocation.display_name(),
                status,
            });
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let inv = Invocation::new("python", "/tools")
            .arg("./convert.py")
            .flag("-b", "4.65");
        assert_eq!(inv.args_lossy(), vec!["./convert.py", "-b", "4.65"]);
        assert_eq!(inv.display_name(), "python ./convert.py");
        assert_eq!(inv.to_string(), "python ./convert.py -b 4.65");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_exit_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = SystemRunner;

        assert!(runner.run(&Invocation::new("true", dir.path())).is_ok());

        let err = runner.run(&Invocation::new("false", dir.path())).unwrap_err();
        assert!(matches!(err, QuantError::ExitStatus { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_failure_matches_real_status() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("false", dir.path());
        let real = SystemRunner.run(&inv).unwrap_err();
        let fake = fake::exit_failure(&inv);
        assert_eq!(real.to_string(), fake.to_string());
        assert_eq!(fake.to_string(), "false exited with exit status: 1");
    }

    #[test]
    fn test_system_runner_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let err = SystemRunner
            .run(&Invocation::new("definitely-not-a-real-program-xyz", dir.path()))
            .unwrap_err();
        assert!(matches!(err, QuantError::Launch { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_uses_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let inv = Invocation::new("sh", dir.path()).flag("-c", "touch marker");
        SystemRunner.run(&inv).unwrap();
        assert!(dir.path().join("marker").exists());
    }
}
