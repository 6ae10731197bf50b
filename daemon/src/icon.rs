/// Application icon extraction.
///
/// The icon associated with an executable is rasterized to PNG by a short
/// PowerShell script using `System.Drawing.Icon.ExtractAssociatedIcon`.
/// Extracted icons are cached by file name and never regenerated.
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Returns the icon file name for an executable: its file stem plus `.png`
/// (`C:\Games\RocketLeague.exe` → `RocketLeague.png`).
pub fn icon_file_name(exe_path: &Path) -> Option<String> {
    exe_path
        .file_stem()
        .map(|stem| format!("{}.png", stem.to_string_lossy()))
}

/// Quotes `s` as a PowerShell single-quoted string literal.
fn ps_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Builds the PowerShell script that writes `exe_path`'s icon to `out_path` as PNG.
pub fn powershell_script(exe_path: &Path, out_path: &Path) -> String {
    format!(
        "Add-Type -AssemblyName System.Drawing; \
         $icon=[System.Drawing.Icon]::ExtractAssociatedIcon({}); \
         $bmp=$icon.ToBitmap(); \
         $bmp.Save({},[System.Drawing.Imaging.ImageFormat]::Png);",
        ps_quote(&exe_path.to_string_lossy()),
        ps_quote(&out_path.to_string_lossy()),
    )
}

/// Ensures `<icons_dir>/<stem>.png` exists for `exe_path`, extracting it if needed.
///
/// Returns the icon path. Extraction is skipped when the file is already present.
pub fn ensure_icon(exe_path: &Path, icons_dir: &Path) -> Result<PathBuf> {
    let file_name = icon_file_name(exe_path)
        .with_context(|| format!("Executable path has no file name: {}", exe_path.display()))?;
    let icon_path = icons_dir.join(file_name);

    if icon_path.is_file() {
        log::debug!("Icon already cached: {}", icon_path.display());
        return Ok(icon_path);
    }

    log::info!("Extracting icon for {} ...", exe_path.display());
    extract_icon(exe_path, &icon_path)?;
    Ok(icon_path)
}

/// Runs PowerShell to extract `exe_path`'s associated icon into `out_path`.
///
/// Blocks until PowerShell exits; call from a blocking context.
pub fn extract_icon(exe_path: &Path, out_path: &Path) -> Result<()> {
    #[cfg(not(windows))]
    {
        let _ = (exe_path, out_path);
        bail!("Icon extraction is only supported on Windows");
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x08000000;

        let status = std::process::Command::new("powershell")
            .args([
                "-NoLogo",
                "-NoProfile",
                "-NonInteractive",
                "-WindowStyle",
                "Hidden",
                "-Command",
            ])
            .arg(powershell_script(exe_path, out_path))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .creation_flags(CREATE_NO_WINDOW)
            .status()
            .context("Failed to launch powershell")?;

        if !status.success() {
            bail!("powershell exited with {status} while extracting icon");
        }
        Ok(())
    }
}
