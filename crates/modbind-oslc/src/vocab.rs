//! OSLC and Jazz RM vocabulary

pub use modbind_structure::vocab::{OSLC_CONFIG, RDF, RDF_NIL, RM_MODULES};

pub const DCTERMS: &str = "http://purl.org/dc/terms/";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const OSLC: &str = "http://open-services.net/ns/core#";
pub const OSLC_RM: &str = "http://open-services.net/ns/rm#";
pub const OSLC_RM_V2: &str = "http://open-services.net/xmlns/rm/1.0/";
pub const OSLC_AUTO: &str = "http://open-services.net/ns/auto#";
pub const JAZZ_RM: &str = "http://jazz.net/ns/rm#";
pub const JAZZ_PROCESS: &str = "http://jazz.net/ns/process#";
pub const NAV: &str = "http://jazz.net/ns/rm/navigation#";
pub const XHTML: &str = "http://www.w3.org/1999/xhtml";

/// `oslc_rm:Requirement`
pub const REQUIREMENT_TYPE: &str = "http://open-services.net/ns/rm#Requirement";
/// `jazz_rm:Module`
pub const MODULE_TYPE: &str = "http://jazz.net/ns/rm#Module";
/// Extra type marker carried by heading artifacts
pub const HEADING_TYPE: &str = "https://hep.continental.com/ns/automotive/rm/ty/heading";
/// `jazz_rm:Text`
pub const TEXT_TYPE: &str = "http://jazz.net/ns/rm#Text";
/// `nav:folder`
pub const FOLDER_TYPE: &str = "http://jazz.net/ns/rm/navigation#folder";
/// `oslc_config:Component`
pub const COMPONENT_TYPE: &str = "http://open-services.net/ns/config#Component";

/// Prefixes understood in query filters and used to compact result keys
pub const PREFIXES: &[(&str, &str)] = &[
    ("dcterms", DCTERMS),
    ("rdf", RDF),
    ("rdfs", RDFS),
    ("oslc", OSLC),
    ("oslc_rm", OSLC_RM),
    ("oslc_config", OSLC_CONFIG),
    ("jazz_rm", JAZZ_RM),
    ("nav", NAV),
    ("rm_modules", RM_MODULES),
];

/// Namespace bound to a known prefix
#[must_use]
pub fn namespace_of(prefix: &str) -> Option<&'static str> {
    PREFIXES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, ns)| *ns)
}

/// `prefix:local` for known namespaces, `{ns}local` otherwise
#[must_use]
pub fn compact(namespace: Option<&str>, local: &str) -> String {
    match namespace {
        None => local.to_owned(),
        Some(ns) => match PREFIXES.iter().find(|(_, n)| *n == ns) {
            Some((prefix, _)) => format!("{prefix}:{local}"),
            None => format!("{{{ns}}}{local}"),
        },
    }
}

/// Response header set by Jazz form authentication
pub const AUTH_MSG_HEADER: &str = "x-com-ibm-team-repository-web-auth-msg";
/// Configuration selection for OSLC calls
pub const CONFIGURATION_CONTEXT_HEADER: &str = "Configuration-Context";
/// Configuration selection for module structure calls
pub const VVC_CONFIGURATION_HEADER: &str = "vvc.configuration";
/// Marks module structure calls as public API calls
pub const DOORS_REQUEST_TYPE_HEADER: &str = "DoorsRP-Request-Type";
pub const DOORS_REQUEST_TYPE: &str = "public 2.0";
pub const OSLC_CORE_VERSION_HEADER: &str = "OSLC-Core-Version";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_known_and_unknown() {
        assert_eq!(compact(Some(DCTERMS), "title"), "dcterms:title");
        assert_eq!(compact(Some("urn:x#"), "y"), "{urn:x#}y");
        assert_eq!(compact(None, "z"), "z");
    }

    #[test]
    fn prefix_lookup() {
        assert_eq!(namespace_of("nav"), Some(NAV));
        assert_eq!(namespace_of("nope"), None);
    }
}
