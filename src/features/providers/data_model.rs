//! Data-model features and the per-framework data-model labels.

use crate::features::{FeatureValue, FnFeature, FnLabel, Registry, Target};
use crate::views::{ViewGroup, ViewKind};

use super::data_model_of;

const DATA_MODEL_VIEWS: [ViewKind; 6] = [
    ViewKind::Mongoose,
    ViewKind::SequelizeDefine,
    ViewKind::Typeorm,
    ViewKind::ConstructorFunction,
    ViewKind::Class,
    ViewKind::Interface,
];

pub fn register(registry: &mut Registry) {
    let group = Target::group(ViewGroup::DataModel);

    // A view is labelled with its own kind only.
    for kind in DATA_MODEL_VIEWS {
        registry.register_label(
            group.view(kind),
            FnLabel::new("DataModelLabel", kind.label_variant(), |_| true),
        );
    }

    registry
        .register_feature(
            group,
            FnFeature::new(&["DataModelName"], |input| {
                let model = data_model_of(input)?;
                Ok(vec![input.cap(model.name(), "dataModelName").into()])
            }),
        )
        .register_feature(
            group,
            FnFeature::new(&["DataModelProperties", "DataModelPropertiesCount"], |input| {
                let fields = data_model_of(input)?.fields();
                Ok(vec![FeatureValue::Map(fields.clone()), fields.len().into()])
            }),
        )
        .register_feature(
            group,
            FnFeature::new(&["DataModelMethodsCount"], |input| {
                Ok(vec![data_model_of(input)?.method_count().into()])
            }),
        )
        .register_feature(
            group,
            FnFeature::new(&["IsConfirmedDataModel"], |input| {
                Ok(vec![data_model_of(input)?.is_confirmed().into()])
            }),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{build, resolve};
    use crate::features::ProviderSettings;
    use crate::model::{Argument, CallConstruct, Construct, Import, ParsedModule, Span, SyntaxKind};
    use crate::views::{select, ViewContext};
    use crate::vocab::Vocabulary;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sequelize_model_features_and_labels() {
        let mut module = ParsedModule::new("models/user.js");
        module.imports = vec![Import::new("sequelize")];
        module.constructs = vec![Construct::Call(CallConstruct {
            span: Span::new((2, 13), (5, 2)),
            target: "sequelize.define".into(),
            is_property_access: true,
            owner_text: Some("sequelize".into()),
            method_name: Some("define".into()),
            arguments: vec![
                Argument {
                    syntax: SyntaxKind::StringLiteral,
                    type_name: "string-literal".into(),
                    literal: Some("User".into()),
                    ..Default::default()
                },
                Argument {
                    syntax: SyntaxKind::ObjectLiteralExpression,
                    type_name: "object".into(),
                    shape: Some(
                        serde_json::from_str(
                            r#"{
                                "firstName": {"type": "DataTypes.STRING"},
                                "age": "Sequelize.INTEGER"
                            }"#,
                        )
                        .unwrap(),
                    ),
                    ..Default::default()
                },
            ],
            ..Default::default()
        })];
        let module = resolve(build(module), &Vocabulary::default());
        let vocab = Vocabulary::default();
        let cx = ViewContext::new(&module, &vocab);
        let selection = select(&module.entities()[0], cx, &[ViewGroup::DataModel]);
        assert_eq!(selection.views[0].kind(), ViewKind::SequelizeDefine);

        let mut registry = Registry::new();
        register(&mut registry);
        let (features, diagnostics) =
            registry.dispatch(&selection.views[0], cx, &ProviderSettings::default());
        assert!(diagnostics.is_empty());

        let labels: Vec<_> = features.labels().collect();
        assert_eq!(
            labels,
            vec![
                ("!DataModelLabel!Mongoose", false),
                ("!DataModelLabel!SequelizeDefine", true),
                ("!DataModelLabel!Typeorm", false),
                ("!DataModelLabel!ConstructorFunction", false),
                ("!DataModelLabel!Class", false),
                ("!DataModelLabel!Interface", false),
            ]
        );
        assert_eq!(features.get("DataModelName"), Some(&FeatureValue::from("User")));
        assert_eq!(features.get("DataModelPropertiesCount"), Some(&FeatureValue::Number(2)));
        assert_eq!(features.get("IsConfirmedDataModel"), Some(&FeatureValue::Bool(true)));
        let Some(FeatureValue::Map(fields)) = features.get("DataModelProperties") else {
            panic!("properties should be a map");
        };
        assert_eq!(fields.get("firstName"), Some("STRING"));
        assert_eq!(fields.get("age"), Some("INTEGER"));
    }
}
