//! Output path derivation

use std::path::{Component, Path, PathBuf};

use super::types::ExportType;

/// Folder tag for an archive: its file name up to the first dot, prefixed
/// with `dlc_` when the archive sits in a `dlc/hub` directory.
///
/// `base/dlc/hub/hub.resources` becomes `dlc_hub`, keeping DLC hub content
/// apart from the base game's `hub`.
#[must_use]
pub fn resource_folder(archive: &Path) -> String {
    let path = archive.to_string_lossy().replace('\\', "/");
    let Some(slash) = path.rfind('/') else {
        return folder_of_name(&path).to_string();
    };

    let folder = folder_of_name(&path[slash + 1..]);
    let in_dlc_hub = slash >= 8 && path.get(slash - 8..slash) == Some("/dlc/hub");
    if in_dlc_hub {
        format!("dlc_{folder}")
    } else {
        folder.to_string()
    }
}

fn folder_of_name(name: &str) -> &str {
    name.find('.').map_or(name, |dot| &name[..dot])
}

/// Turn an entry name into a relative path, dropping root, parent and
/// empty components.
#[must_use]
pub fn relative_entry_path(name: &str) -> PathBuf {
    let normalized = name.replace('\\', "/");
    Path::new(&normalized)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

/// `output_root/folder_tag/name`, with the texture extension appended to
/// images.
#[must_use]
pub fn build_output_path(
    output_root: &Path,
    folder_tag: &str,
    name: &str,
    export_type: ExportType,
    texture_extension: &str,
) -> PathBuf {
    let mut path = output_root.join(folder_tag).join(relative_entry_path(name));
    if export_type == ExportType::Image {
        let mut file = path.file_name().unwrap_or_default().to_os_string();
        file.push(".");
        file.push(texture_extension);
        path.set_file_name(file);
    }
    path
}
