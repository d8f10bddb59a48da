//! Resume launcher — a one-line script that re-runs the current campaign.
//!
//! Written next to the ledger as `<save>.bat` on Windows and `<save>.sh`
//! elsewhere. Re-running it with the same save name resumes the campaign.
//! Arguments are quoted so the shell hands them back verbatim.

use std::path::{Path, PathBuf};

#[cfg(windows)]
const LAUNCHER_EXTENSION: &str = "bat";
#[cfg(not(windows))]
const LAUNCHER_EXTENSION: &str = "sh";

/// Name of the running executable, falling back to `broadcast`.
pub fn executable_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "broadcast".into())
}

/// Join `exe` and `args` into one shell line, quoting every word.
pub fn command_line(exe: &str, args: &[String]) -> String {
    let mut line = quote(exe);
    for arg in args {
        line.push(' ');
        line.push_str(&quote(arg));
    }
    line
}

/// Write `<dir>/<save>.<ext>` containing `line`.
pub fn write_launcher(dir: &Path, save: &str, line: &str) -> std::io::Result<PathBuf> {
    let path = dir.join(format!("{save}.{LAUNCHER_EXTENSION}"));
    std::fs::write(&path, format!("{line}\n"))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }

    Ok(path)
}

/// POSIX single quotes; nothing inside is expanded. `'` becomes `'\''`.
#[cfg(not(windows))]
fn quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// cmd.exe double quotes. `%` is doubled so batch files keep it literal.
#[cfg(windows)]
fn quote(arg: &str) -> String {
    format!("\"{}\"", arg.replace('"', "\"\"").replace('%', "%%"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[cfg(not(windows))]
    #[test]
    fn test_command_line_single_quotes_every_word() {
        let args = strings(&["-w", "hi||there friend", "-s", "spring", "-r"]);
        assert_eq!(
            command_line("broadcast", &args),
            "'broadcast' '-w' 'hi||there friend' '-s' 'spring' '-r'"
        );
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote(""), "''");
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_replays_arguments_verbatim() {
        let args = strings(&["%s|", "cost $HOME `echo pwned` \\n it's", "a$HOME", "%0A"]);
        let output = std::process::Command::new("sh")
            .arg("-c")
            .arg(command_line("printf", &args))
            .output()
            .unwrap();
        assert_eq!(
            String::from_utf8(output.stdout).unwrap(),
            "cost $HOME `echo pwned` \\n it's|a$HOME|%0A|"
        );
    }

    #[cfg(windows)]
    #[test]
    fn test_batch_quoting_escapes_percent() {
        assert_eq!(quote("line%0Anext"), "\"line%%0Anext\"");
        assert_eq!(quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_write_launcher() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_launcher(dir.path(), "spring", "broadcast -s spring").unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("spring."));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "broadcast -s spring\n");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }
}
