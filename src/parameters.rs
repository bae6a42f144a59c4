use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use log::debug;
use std::collections::{BTreeMap, HashMap};

use crate::error::BuildError;
use crate::models::{Parameter, Swagger};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Hoists repeated inline parameters into `parameters` and points at them
pub fn deduplicate_parameters(mut swagger: Swagger) -> Result<Swagger, BuildError> {
    let (names_by_json, shared) = collect_shared_parameters(&swagger)?;
    if !swagger.parameters.is_empty() {
        return Err(BuildError::SharedParametersExist);
    }
    debug!("Sharing {} parameters", shared.len());
    swagger.parameters = shared;
    replace_shared_parameters(&names_by_json, &mut swagger)?;
    Ok(swagger)
}

fn is_shareable(param: &Parameter) -> bool {
    if param.is_reference() || param.in_ == "body" {
        return false;
    }
    // `name` parameters embed the resource kind in their description
    !((param.in_ == "query" || param.in_ == "path") && param.name == "name")
}

/// Shared parameters keyed by their JSON form, and the name each one gets
pub fn collect_shared_parameters(
    swagger: &Swagger,
) -> Result<(HashMap<String, String>, BTreeMap<String, Parameter>), BuildError> {
    let mut by_json: BTreeMap<String, &Parameter> = BTreeMap::new();

    for path in swagger.paths.values() {
        let inline = path
            .operations()
            .flat_map(|op| op.parameters.iter())
            .chain(path.parameters.iter());
        for param in inline.filter(|p| is_shareable(p)) {
            let key = serde_json::to_string(param)?;
            by_json.entry(key).or_insert(param);
        }
    }

    let mut names_by_json = HashMap::new();
    let mut shared = BTreeMap::new();
    for (key, param) in by_json {
        let base = if param.name.is_empty() {
            "param"
        } else {
            param.name.as_str()
        };
        let name = shared_name(base, &base64_hash(&key), &shared);
        shared.insert(name.clone(), param.clone());
        names_by_json.insert(key, name);
    }

    Ok((names_by_json, shared))
}

/// `base-hash`, or `base-1`, `base-2`, ... when that name is already taken
fn shared_name(base: &str, hash: &str, taken: &BTreeMap<String, Parameter>) -> String {
    let mut name = format!("{}-{}", base, hash);
    let mut attempt = 0;
    while taken.contains_key(&name) {
        attempt += 1;
        name = format!("{}-{}", base, attempt);
    }
    name
}

fn replace_shared_parameters(
    names_by_json: &HashMap<String, String>,
    swagger: &mut Swagger,
) -> Result<(), BuildError> {
    let replace = |params: &mut Vec<Parameter>| -> Result<(), BuildError> {
        for param in params.iter_mut().filter(|p| is_shareable(p)) {
            let key = serde_json::to_string(&*param)?;
            if let Some(name) = names_by_json.get(&key) {
                *param = Parameter::reference(format!("#/parameters/{}", name));
            }
        }
        Ok(())
    };

    for path in swagger.paths.values_mut() {
        for op in path.operations_mut().into_iter().flatten() {
            replace(&mut op.parameters)?;
        }
        replace(&mut path.parameters)?;
    }
    Ok(())
}

/// 8 character URL-safe digest of `s`
pub(crate) fn base64_hash(s: &str) -> String {
    let digest = fnv1_64(s.as_bytes()).to_be_bytes();
    URL_SAFE.encode(&digest[..6])
}

fn fnv1_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        hash.wrapping_mul(FNV_PRIME) ^ u64::from(*byte)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Operation, PathItem, Schema};

    fn query(name: &str, description: &str) -> Parameter {
        Parameter {
            name: name.into(),
            in_: "query".into(),
            description: description.into(),
            type_: "string".into(),
            unique_items: true,
            ..Default::default()
        }
    }

    fn body() -> Parameter {
        Parameter {
            name: "body".into(),
            in_: "body".into(),
            required: true,
            schema: Some(Box::new(Schema::reference("#/definitions/v1.Pod"))),
            ..Default::default()
        }
    }

    fn path_item(params: Vec<Parameter>) -> PathItem {
        PathItem {
            get: Some(Operation {
                id: "list".into(),
                parameters: params,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_hash_is_eight_url_safe_chars() {
        let hash = base64_hash(r#"{"name":"pretty","in":"query"}"#);
        assert_eq!(hash.len(), 8);
        assert!(hash
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(hash, base64_hash(r#"{"name":"pretty","in":"query"}"#));
        assert_ne!(hash, base64_hash(r#"{"name":"pretty","in":"header"}"#));
    }

    #[test]
    fn test_fnv1_reference_values() {
        assert_eq!(fnv1_64(b""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1_64(b"a"), 0xaf63_bd4c_8601_b7be);
    }

    #[test]
    fn test_identical_parameters_share_one_definition() {
        let mut swagger = Swagger::new();
        swagger
            .paths
            .insert("/a".into(), path_item(vec![query("pretty", "pretty print"), body()]));
        swagger
            .paths
            .insert("/b".into(), path_item(vec![query("pretty", "pretty print")]));

        let swagger = deduplicate_parameters(swagger).unwrap();

        assert_eq!(swagger.parameters.len(), 1);
        let (name, shared) = swagger.parameters.iter().next().unwrap();
        assert!(name.starts_with("pretty-"));
        assert_eq!(shared, &query("pretty", "pretty print"));

        let expected_ref = format!("#/parameters/{}", name);
        for path in ["/a", "/b"] {
            let op = swagger.paths[path].get.as_ref().unwrap();
            assert_eq!(op.parameters[0].reference.as_deref(), Some(expected_ref.as_str()));
        }
        // body parameters stay inline
        let a = swagger.paths["/a"].get.as_ref().unwrap();
        assert_eq!(a.parameters[1], body());
    }

    #[test]
    fn test_differing_parameters_get_distinct_names() {
        let mut swagger = Swagger::new();
        swagger.paths.insert(
            "/a".into(),
            path_item(vec![query("pretty", "one"), query("watch", "w")]),
        );
        swagger
            .paths
            .insert("/b".into(), path_item(vec![query("pretty", "two")]));

        let swagger = deduplicate_parameters(swagger).unwrap();
        assert_eq!(swagger.parameters.len(), 3);
        assert_eq!(
            swagger
                .parameters
                .keys()
                .filter(|k| k.starts_with("pretty-"))
                .count(),
            2
        );
    }

    #[test]
    fn test_hash_collisions_fall_back_to_counters() {
        let mut taken = BTreeMap::new();
        assert_eq!(shared_name("pretty", "abcdefgh", &taken), "pretty-abcdefgh");

        taken.insert("pretty-abcdefgh".to_string(), query("pretty", "one"));
        assert_eq!(shared_name("pretty", "abcdefgh", &taken), "pretty-1");

        taken.insert("pretty-1".to_string(), query("pretty", "two"));
        assert_eq!(shared_name("pretty", "abcdefgh", &taken), "pretty-2");
    }

    #[test]
    fn test_name_parameters_are_not_shared() {
        let mut name = query("name", "name of the Pod");
        name.in_ = "path".into();
        name.required = true;

        let mut swagger = Swagger::new();
        swagger.paths.insert(
            "/pods/{name}".into(),
            PathItem {
                parameters: vec![name.clone()],
                ..Default::default()
            },
        );

        let swagger = deduplicate_parameters(swagger).unwrap();
        assert!(swagger.parameters.is_empty());
        assert_eq!(swagger.paths["/pods/{name}"].parameters, vec![name]);
    }

    #[test]
    fn test_existing_shared_parameters_are_rejected() {
        let mut swagger = Swagger::new();
        swagger
            .parameters
            .insert("pretty".into(), query("pretty", ""));
        assert!(matches!(
            deduplicate_parameters(swagger),
            Err(BuildError::SharedParametersExist)
        ));
    }
}
