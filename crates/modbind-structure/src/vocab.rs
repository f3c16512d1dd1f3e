//! Vocabulary used by structure documents

/// RDF syntax namespace
pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
/// Empty RDF list marker
pub const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
/// Module structure namespace
pub const RM_MODULES: &str = "http://jazz.net/ns/rm/dng/module#";
/// Configuration management namespace
pub const OSLC_CONFIG: &str = "http://open-services.net/ns/config#";
/// XML Schema boolean datatype
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

/// Type tag carried by flat-list binding records
pub const BINDING_RECORD_TYPE: &str = "dng_module:Binding";

/// Default prefixes for namespaces the codecs emit
pub const DEFAULT_PREFIXES: &[(&str, &str)] = &[
    ("rdf", RDF),
    ("rm_modules", RM_MODULES),
    ("oslc_config", OSLC_CONFIG),
];
