//! Location features shared by every group.

use crate::features::{FeatureValue, FnFeature, Registry, Target};
use crate::views::ViewGroup;

pub fn register(registry: &mut Registry) {
    for group in ViewGroup::ALL {
        let target = Target::group(group);
        registry
            .register_feature(
                target,
                FnFeature::new(&["Path"], |input| Ok(vec![input.key().path().into()])),
            )
            .register_feature(
                target,
                FnFeature::new(&["LineNumber"], |input| {
                    Ok(vec![(input.key().span().start.line + 1).into()])
                }),
            )
            .register_feature(
                target,
                FnFeature::new(&["EndsLineInFile"], |input| {
                    Ok(vec![(input.key().span().end.line + 1).into()])
                }),
            )
            .register_feature(
                target,
                FnFeature::new(&["EntityViewType"], |input| {
                    Ok(vec![FeatureValue::from(input.view.kind().as_str())])
                }),
            );
    }
}

#[cfg(test)]
mod tests {
    use crate::entity::{build, resolve};
    use crate::features::{FeatureValue, ProviderSettings, Registry};
    use crate::model::{Argument, CallConstruct, Construct, ParsedModule, Span, SyntaxKind};
    use crate::views::{select, ViewContext, ViewGroup};
    use crate::vocab::Vocabulary;

    #[test]
    fn test_location_features_are_one_based() {
        let mut module = ParsedModule::new("dummyPath");
        module.constructs = vec![Construct::Call(CallConstruct {
            span: Span::new((55, 0), (57, 0)),
            target: "foo.bar".into(),
            arguments: vec![Argument {
                syntax: SyntaxKind::Identifier,
                ..Default::default()
            }],
            ..Default::default()
        })];
        let module = resolve(build(module), &Vocabulary::default());
        let vocab = Vocabulary::default();
        let cx = ViewContext::new(&module, &vocab);
        let selection = select(&module.entities()[0], cx, &[ViewGroup::Api]);

        let mut registry = Registry::new();
        super::register(&mut registry);
        let (features, _) =
            registry.dispatch(&selection.views[0], cx, &ProviderSettings::default());

        assert_eq!(features.get("Path"), Some(&FeatureValue::from("dummyPath")));
        assert_eq!(features.get("LineNumber"), Some(&FeatureValue::Number(56)));
        assert_eq!(features.get("EndsLineInFile"), Some(&FeatureValue::Number(58)));
        assert_eq!(features.get("EntityViewType"), Some(&FeatureValue::from("CallExpression")));
    }
}
