//! Manifest assembly
//!
//! Formats the final manifest file: site title, optional description, one
//! section per content kind with links to the uploaded artifacts, and a
//! generation trailer. Assembly is pure formatting over data already in the
//! artifact records; nothing here touches the network.

use chrono::{DateTime, Utc};

/// One artifact link inside a manifest section
#[derive(Debug, Clone)]
pub struct ManifestLink {
    pub title: String,
    pub url: String,
    pub details: Option<String>,
}

/// One per-kind section of the manifest
#[derive(Debug, Clone)]
pub struct ManifestSection {
    pub name: String,
    pub links: Vec<ManifestLink>,
}

/// The assembled manifest, ready for formatting
#[derive(Debug, Clone)]
pub struct Manifest {
    pub title: String,
    pub description: Option<String>,
    pub sections: Vec<ManifestSection>,
    pub generated_at: DateTime<Utc>,
    pub item_count: usize,
}

/// Formats a manifest as its final text representation
///
/// # Arguments
///
/// * `manifest` - The assembled manifest data
///
/// # Returns
///
/// The manifest file content
pub fn format_manifest(manifest: &Manifest) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n", manifest.title));

    if let Some(description) = manifest
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
    {
        out.push_str(&format!("\n> {}\n", description.trim()));
    }

    for section in &manifest.sections {
        out.push_str(&format!("\n## {}\n\n", section.name));
        for link in &section.links {
            match link.details.as_deref().filter(|d| !d.is_empty()) {
                Some(details) => {
                    out.push_str(&format!("- [{}]({}): {}\n", link.title, link.url, details))
                }
                None => out.push_str(&format!("- [{}]({})\n", link.title, link.url)),
            }
        }
    }

    out.push_str(&format!(
        "\n*Generated on {} with {} items*\n",
        manifest.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        manifest.item_count
    ));

    out
}
