//! Features of the class an api call or method is written in.
//!
//! Without an enclosing class every name gets an empty value, not the
//! irrelevant marker.

use crate::entity::ClassEntity;
use crate::features::{FeatureValue, FnFeature, ProviderInput, Registry, Target};
use crate::model::PathMap;
use crate::views::ViewGroup;

fn empty(count: usize) -> Vec<FeatureValue> {
    vec![FeatureValue::from(""); count]
}

/// `(full, last segment)` of a dotted heritage name.
fn heritage_names(full: Option<&str>) -> (String, String) {
    match full.filter(|s| !s.is_empty()) {
        Some(full) => {
            let last = full.rsplit('.').next().unwrap_or(full);
            (full.to_string(), last.to_string())
        }
        None => (String::new(), String::new()),
    }
}

fn with_class(
    input: &ProviderInput<'_>,
    count: usize,
    f: impl FnOnce(&ClassEntity) -> Vec<FeatureValue>,
) -> Vec<FeatureValue> {
    input.class_entity().map_or_else(|| empty(count), f)
}

pub fn register(registry: &mut Registry) {
    for group in [ViewGroup::Api, ViewGroup::Method] {
        let target = Target::group(group);
        registry
            .register_feature(
                target,
                FnFeature::new(&["ClassName", "HasClassName"], |input| {
                    let name = input.class_entity().map(|c| c.name.as_str()).unwrap_or_default();
                    Ok(vec![input.cap(name, "className").into(), (!name.is_empty()).into()])
                }),
            )
            .register_feature(
                target,
                FnFeature::new(&["ClassDecorators", "HasClassDecorators"], |input| {
                    Ok(with_class(input, 2, |class| {
                        let names: Vec<String> =
                            class.decorators.iter().map(|d| d.name.clone()).collect();
                        let has_any = !names.is_empty();
                        vec![names.into(), has_any.into()]
                    }))
                }),
            )
            .register_feature(
                target,
                FnFeature::new(&["IsAbstractClass"], |input| {
                    Ok(vec![input.class_entity().is_some_and(|c| c.is_abstract).into()])
                }),
            )
            .register_feature(
                target,
                FnFeature::new(
                    &["ClassExtendedClassesFullNames", "ClassExtendedClassesNames"],
                    |input| {
                        Ok(with_class(input, 2, |class| {
                            let (full, last) = heritage_names(class.extends.as_deref());
                            let as_list = |s: String| {
                                FeatureValue::List(if s.is_empty() { Vec::new() } else { vec![s] })
                            };
                            vec![as_list(full), as_list(last)]
                        }))
                    },
                ),
            )
            .register_feature(
                target,
                FnFeature::new(
                    &["ClassImplementedInterfaceFullName", "ClassImplementedInterfaceName"],
                    |input| {
                        Ok(with_class(input, 2, |class| {
                            let (full, last) = heritage_names(class.implements.as_deref());
                            vec![full.into(), last.into()]
                        }))
                    },
                ),
            )
            .register_feature(
                target,
                FnFeature::new(&["ClassPropertiesJson"], |input| {
                    let properties: PathMap = input
                        .class_entity()
                        .map(|class| {
                            class
                                .all_properties()
                                .into_iter()
                                .map(|p| (p.name.clone(), p.type_name.clone()))
                                .collect()
                        })
                        .unwrap_or_default();
                    Ok(vec![properties.into()])
                }),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{build, resolve};
    use crate::features::ProviderSettings;
    use crate::model::{
        Argument, CallConstruct, ClassConstruct, Construct, Decorator, ParsedModule, Span,
        TypedName,
    };
    use crate::views::{select, ViewContext};
    use crate::vocab::Vocabulary;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_class_features_inside_and_outside_class() {
        let class_span = Span::new((0, 0), (10, 1));
        let mut module = ParsedModule::new("users.controller.ts");
        module.constructs = vec![
            Construct::Class(ClassConstruct {
                span: class_span,
                name: Some("UsersController".into()),
                extends: Some("base.BaseController".into()),
                decorators: vec![Decorator { name: "Controller".into(), arguments: vec![] }],
                properties: vec![TypedName::new("service", "UsersService")],
                ..Default::default()
            }),
            Construct::Call(CallConstruct {
                span: Span::new((3, 2), (3, 20)),
                target: "this.service.find".into(),
                arguments: vec![Argument::default()],
                enclosing_class: Some(class_span),
                ..Default::default()
            }),
            Construct::Call(CallConstruct {
                span: Span::new((12, 0), (12, 20)),
                target: "outside".into(),
                arguments: vec![Argument::default()],
                ..Default::default()
            }),
        ];
        let module = resolve(build(module), &Vocabulary::default());
        let vocab = Vocabulary::default();
        let cx = ViewContext::new(&module, &vocab);
        let mut registry = Registry::new();
        register(&mut registry);

        let inside = select(&module.entities()[1], cx, &[ViewGroup::Api]);
        let (features, _) = registry.dispatch(&inside.views[0], cx, &ProviderSettings::default());
        assert_eq!(features.get("ClassName"), Some(&FeatureValue::from("UsersController")));
        assert_eq!(
            features.get("ClassDecorators"),
            Some(&FeatureValue::List(vec!["Controller".to_string()]))
        );
        assert_eq!(
            features.get("ClassExtendedClassesNames"),
            Some(&FeatureValue::List(vec!["BaseController".to_string()]))
        );
        assert_eq!(features.get("ClassImplementedInterfaceName"), Some(&FeatureValue::from("")));
        assert_eq!(
            features.get("ClassPropertiesJson"),
            Some(&FeatureValue::Map(PathMap::from_iter([("service", "UsersService")])))
        );

        let outside = select(&module.entities()[2], cx, &[ViewGroup::Api]);
        let (features, _) = registry.dispatch(&outside.views[0], cx, &ProviderSettings::default());
        assert_eq!(features.get("HasClassName"), Some(&FeatureValue::from(false)));
        assert_eq!(features.get("ClassDecorators"), Some(&FeatureValue::from("")));
        assert_eq!(features.get("ClassPropertiesJson"), Some(&FeatureValue::Map(PathMap::new())));
    }
}
