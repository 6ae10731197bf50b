/// Executables whose foreground windows are never worth tagging a replay with.
///
/// Matching is on the executable's file name (extension included) and is
/// case-insensitive. A handful of entries are MMC snap-ins (`*.msc`); they can
/// only match if the host process itself reports that name, but they are kept
/// so the list reads the same as what users see in Task Manager.
use std::path::Path;

const WINDOWS_SYSTEM_APPS: &[&str] = &[
    "explorer.exe",
    "SystemSettings.exe",
    "SearchUI.exe",
    "ShellExperienceHost.exe",
    "StartMenuExperienceHost.exe",
    "Taskmgr.exe",
    "SnippingTool.exe",
    "SnipAndSketch.exe",
    "Magnify.exe",
    "Narrator.exe",
    "osk.exe",
    "mspaint.exe",
    "notepad.exe",
    "winver.exe",
    "calc.exe",
    "winword.exe",
    "excel.exe",
    "powerpnt.exe",
    "OneNote.exe",
    "regedit.exe",
    "cmd.exe",
    "powershell.exe",
    "WindowsTerminal.exe",
    "wt.exe",
    "conhost.exe",
    "mmc.exe",
    "control.exe",
    "rundll32.exe",
    "CompMgmtLauncher.exe",
    // UWP host and broker processes
    "ApplicationFrameHost.exe",
    "RuntimeBroker.exe",
    "taskschd.msc",
    "eventvwr.msc",
    "perfmon.exe",
    "dfrgui.exe",
    "OptionalFeatures.exe",
    "SystemPropertiesComputerName.exe",
    "TaskSchd.exe",
    "schtasks.exe",
    "services.msc",
    "devmgmt.msc",
    "diskmgmt.msc",
    "compmgmt.msc",
    "gpedit.msc",
    "secpol.msc",
    "Msinfo32.exe",
    "dxdiag.exe",
    "wscript.exe",
    "cscript.exe",
    "mrt.exe",
    "SearchApp.exe",
    "LockApp.exe",
    "ctfmon.exe",
    "sihost.exe",
    "BackgroundTaskHost.exe",
    "SettingSyncHost.exe",
    "YourPhone.exe",
    "PhoneExperienceHost.exe",
    "FilePickerHost.exe",
    "PickerHost.exe",
    "smartscreen.exe",
    "WerFault.exe",
    "cleanmgr.exe",
    "certmgr.msc",
    "wf.msc",
];

const ARCHIVE_TOOLS_AND_FILE_MANAGERS: &[&str] = &[
    "7zFM.exe",
    "WinRAR.exe",
    "WinZip32.exe",
    "PeaZip.exe",
    "TotalCmd.exe",
    "FreeCommander.exe",
    "Q-Dir.exe",
    "MultiCommander.exe",
    "Everything.exe",
    "TreeSizeFree.exe",
];

const INSTALLERS_AND_LAUNCHERS: &[&str] = &[
    "setup.exe",
    "uninstall.exe",
    "msiexec.exe",
    "dxsetup.exe",
    "installshield.exe",
    "bootstrapper.exe",
    "update.exe",
    "unins000.exe",
];

const VIRTUALIZATION_APPS: &[&str] = &[
    "vmware.exe",
    "vmware-vmx.exe",
    "VirtualBox.exe",
    "vboxheadless.exe",
    "vboxmanage.exe",
    "mstsc.exe",
    "TeamViewer.exe",
];

const ANTIVIRUS_AND_CLEANERS: &[&str] = &[
    "AvastUI.exe",
    "avgui.exe",
    "msmpeng.exe",
    "SecurityHealthSystray.exe",
    "Malwarebytes.exe",
    "CCleaner.exe",
    "AdwCleaner.exe",
    "NortonSecurity.exe",
    "McUICnt.exe",
];

const DEBUGGING_AND_DEV_TOOLS: &[&str] = &[
    "Procmon.exe",
    "ProcessHacker.exe",
    "ProcessExplorer.exe",
    "Autoruns.exe",
    "VMMap.exe",
    "windbg.exe",
    "OllyDbg.exe",
    "x64dbg.exe",
    "DependencyWalker.exe",
    "HxD.exe",
];

const PRINTER_AND_SCANNER_APPS: &[&str] = &[
    "FaxConsole.exe",
    "PrintDialog.exe",
    "printmanagement.msc",
    "HPScan.exe",
    "CanonIJ.exe",
    "EpsonScan.exe",
];

const ACCESSORIES: &[&str] = &[
    "wordpad.exe",
    "write.exe",
    "charmap.exe",
    "stikynot.exe",
    "XpsRchVw.exe",
    "hh.exe",
    "MobilityCenter.exe",
];

const CATEGORIES: &[&[&str]] = &[
    WINDOWS_SYSTEM_APPS,
    ARCHIVE_TOOLS_AND_FILE_MANAGERS,
    INSTALLERS_AND_LAUNCHERS,
    VIRTUALIZATION_APPS,
    ANTIVIRUS_AND_CLEANERS,
    DEBUGGING_AND_DEV_TOOLS,
    PRINTER_AND_SCANNER_APPS,
    ACCESSORIES,
];

/// Iterates over every built-in ignored executable name.
pub fn builtin() -> impl Iterator<Item = &'static str> {
    CATEGORIES.iter().flat_map(|c| c.iter().copied())
}

/// Returns `true` if `name` (a bare file name such as `"Notepad.EXE"`) is on
/// the built-in list or in `extra`, ignoring ASCII case.
pub fn is_ignored_name(name: &str, extra: &[String]) -> bool {
    builtin().any(|n| n.eq_ignore_ascii_case(name))
        || extra.iter().any(|n| n.eq_ignore_ascii_case(name))
}

/// Returns `true` if the executable at `exe_path` should be skipped.
/// Paths without a file name are never ignored.
pub fn is_ignored(exe_path: &Path, extra: &[String]) -> bool {
    match exe_path.file_name() {
        Some(name) => is_ignored_name(&name.to_string_lossy(), extra),
        None => false,
    }
}
