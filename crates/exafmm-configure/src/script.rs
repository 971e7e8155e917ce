//! The reconfiguration script that replays a configure run.

use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::artifacts::write_artifact;
use crate::error::Result;
use crate::options::{CommandLine, ARCH_KEY, CONFIG_MODULES_KEY, OPTIONS_MODULE_KEY};
use crate::stage::ProjectNames;

/// `<dir>/<arch>/conf/reconfigure-<arch>.sh`.
pub fn script_path(dir: &Path, arch: &str) -> PathBuf {
    dir.join(arch)
        .join("conf")
        .join(format!("reconfigure-{arch}.sh"))
}

/// Arguments the script passes back to `configure`.
///
/// Module selections naming the defaults are dropped, and `--arch` is
/// appended when the original run did not give one.
pub fn reconfigure_arguments(
    command_line: &CommandLine,
    names: &ProjectNames,
    arch: &str,
) -> Vec<String> {
    let mut args: Vec<String> = command_line
        .iter()
        .filter(|(key, raw)| {
            let value = CommandLine::parse_argument(raw).1;
            !(*key == CONFIG_MODULES_KEY && value == names.configure_module
                || *key == OPTIONS_MODULE_KEY && value == names.options_module)
        })
        .map(|(_, raw)| raw.to_string())
        .collect();
    if !command_line.contains(ARCH_KEY) {
        args.push(format!("--{ARCH_KEY}={arch}"));
    }
    args
}

/// Quote `s` for a POSIX shell.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// A POSIX shell script that reruns `program configure` from `dir`.
pub fn render_script(dir: &Path, program: &Path, args: &[String]) -> String {
    let mut out = String::from("#!/bin/sh\n");
    out.push_str(&format!(
        "cd {} || exit 1\n",
        shell_quote(&dir.display().to_string())
    ));
    out.push_str(&format!(
        "exec {} configure",
        shell_quote(&program.display().to_string())
    ));
    for arg in args {
        out.push_str(" \\\n  ");
        out.push_str(&shell_quote(arg));
    }
    out.push('\n');
    out
}

/// Write the script and make it executable.
///
/// A failed `chmod` is logged and otherwise ignored.
pub fn write_script(path: &Path, contents: &str) -> Result<()> {
    write_script_with(path, contents, make_executable)
}

fn write_script_with<F>(path: &Path, contents: &str, set_mode: F) -> Result<()>
where
    F: FnOnce(&Path) -> io::Result<()>,
{
    write_artifact(path, contents)?;
    if let Err(e) = set_mode(path) {
        warn!(path = %path.display(), error = %e, "unable to make reconfigure script executable");
    }
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o775))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "no execute permission bits on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Recover the quoted arguments following `configure`.
    fn read_script_arguments(script: &str) -> Vec<String> {
        script
            .lines()
            .skip_while(|l| !l.starts_with("exec "))
            .skip(1)
            .map(|l| {
                let quoted = l.trim().trim_end_matches('\\').trim_end();
                quoted[1..quoted.len() - 1].replace(r"'\''", "'")
            })
            .collect()
    }

    fn names() -> ProjectNames {
        ProjectNames::new("ExaFMM")
    }

    #[test]
    fn path_is_under_arch_conf() {
        assert_eq!(
            script_path(Path::new("/src/exafmm"), "arch-linux-opt"),
            Path::new("/src/exafmm/arch-linux-opt/conf/reconfigure-arch-linux-opt.sh")
        );
    }

    #[test]
    fn arch_appended_when_missing() {
        let cl = CommandLine::from_args(["--with-device=gpu"]);
        let args = reconfigure_arguments(&cl, &names(), "arch-linux-opt");
        assert_eq!(args, vec!["--with-device=gpu", "--arch=arch-linux-opt"]);
    }

    #[test]
    fn explicit_arch_is_kept() {
        let cl = CommandLine::from_args(["--arch=arch-custom", "--with-mpi"]);
        let args = reconfigure_arguments(&cl, &names(), "arch-custom");
        assert_eq!(args, vec!["--arch=arch-custom", "--with-mpi"]);
    }

    #[test]
    fn default_modules_dropped_custom_kept() {
        let cl = CommandLine::from_args([
            "--config-modules=ExaFMM.Configure",
            "--options-module=site.compilerOptions",
        ]);
        let args = reconfigure_arguments(&cl, &names(), "arch-a");
        assert_eq!(args, vec!["--options-module=site.compilerOptions", "--arch=arch-a"]);

        let cl = CommandLine::from_args(["--options-module=ExaFMM.compilerOptions"]);
        assert_eq!(reconfigure_arguments(&cl, &names(), "arch-a"), vec!["--arch=arch-a"]);
    }

    #[test]
    fn script_quotes_arguments() {
        let args = vec!["--CFLAGS=-O2 -g".to_string(), "--prefix=/it's/here".to_string()];
        let script = render_script(Path::new("/src/exafmm"), Path::new("/usr/bin/exafmm"), &args);
        assert!(script.starts_with("#!/bin/sh\ncd '/src/exafmm' || exit 1\nexec '/usr/bin/exafmm' configure \\\n"));
        assert_eq!(read_script_arguments(&script), args);
    }

    #[test]
    fn script_without_arguments() {
        let script = render_script(Path::new("/d"), Path::new("exafmm"), &[]);
        assert_eq!(script, "#!/bin/sh\ncd '/d' || exit 1\nexec 'exafmm' configure\n");
    }

    #[cfg(unix)]
    #[test]
    fn written_script_is_executable() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("reconfigure-a.sh");
        write_script(&path, "#!/bin/sh\n").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o775);
    }

    #[test]
    fn chmod_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reconfigure-arch-a.sh");
        write_script_with(&path, "#!/bin/sh\n", |_| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only mount"))
        })
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "#!/bin/sh\n");
    }
}
