use std::path::Path;
use std::process::Command;

/// Name of the branch the working tree has checked out.
pub fn current_branch(project_dir: &Path) -> crate::Result<String> {
    run_git(project_dir, &["rev-parse", "--abbrev-ref", "HEAD"])
}

/// Abbreviated hash of the checked-out commit.
pub fn short_head(project_dir: &Path) -> crate::Result<String> {
    run_git(project_dir, &["rev-parse", "--short", "HEAD"])
}

/// Checks whether the git working tree has uncommitted changes.
pub fn is_dirty(project_dir: &Path) -> crate::Result<bool> {
    let output = Command::new("git")
        .args(["status", "--porcelain"])
        .current_dir(project_dir)
        .output()
        .map_err(|e| crate::Error::GitCommand {
            detail: "failed to execute git status".to_owned(),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(crate::Error::GitFailed {
            detail: format!(
                "git status exited with {}: {}",
                output.status,
                stderr.trim()
            ),
        });
    }

    Ok(!output.stdout.is_empty())
}

fn run_git(project_dir: &Path, args: &[&str]) -> crate::Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(project_dir)
        .output()
        .map_err(|e| crate::Error::GitCommand {
            detail: format!("failed to execute git {}", args.join(" ")),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(crate::Error::GitFailed {
            detail: format!(
                "git {} exited with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            ),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}
