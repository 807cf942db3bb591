mod archive;
mod numbering;
mod registry;

pub use archive::{export_profile, import_profile, PROFILE_ENTRY};
pub use numbering::{
    company_prefix, format_quotation_number, generate_quotation_number,
    generate_quotation_number_on, last_quotation_number, peek_quotation_number,
};
pub use registry::{create_preset, delete_preset, duplicate_preset, list_presets, rename_preset};
pub use crate::config::TEMPLATE_EXTENSIONS;
