use crate::analysis::ProjectDescriptor;
use std::fmt::Write as _;

/// Renders `terraform.tfvars` for the descriptor
///
/// Always deterministic: the values come from the descriptor and the image
/// tag, never from inference output.
pub fn render_tfvars(descriptor: &ProjectDescriptor, analysis_id: &str, image_tag: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "analysis_id = \"{}\"", analysis_id);
    let _ = writeln!(out, "container_port = {}", descriptor.listen_port);
    let _ = writeln!(out, "cpu = {}", descriptor.resource_tier.cpu_units());
    let _ = writeln!(out, "memory = {}", descriptor.resource_tier.memory_mib());
    let _ = writeln!(out, "image_tag = \"{}\"", image_tag);
    let _ = writeln!(out, "resource_tier = \"{}\"", descriptor.resource_tier.as_str());
    if let Some(db) = descriptor.database_requirement {
        let _ = writeln!(out, "database_type = \"{}\"", db.as_str());
    }
    out
}
