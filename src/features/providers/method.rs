//! Features of function-like declarations.

use crate::features::{FeatureValue, FnFeature, Registry, Target};
use crate::model::PathMap;
use crate::views::{ViewGroup, ViewKind};

use super::function_of;

pub fn register(registry: &mut Registry) {
    let methods = Target::group(ViewGroup::Method).view(ViewKind::FunctionLike);
    registry
        .register_feature(
            methods,
            FnFeature::new(&["MethodName", "HasMethodName", "MethodType"], |input| {
                let function = function_of(input)?;
                Ok(vec![
                    input.cap(&function.name, "functionName").into(),
                    function.has_real_name.into(),
                    function.function_type.as_str().into(),
                ])
            }),
        )
        .register_feature(
            methods,
            FnFeature::new(&["MethodParametersCount", "MethodParametersJson"], |input| {
                let function = function_of(input)?;
                let parameters: PathMap = function
                    .parameters
                    .iter()
                    .map(|p| (p.name.as_str(), p.type_name.as_str()))
                    .collect();
                Ok(vec![function.parameters.len().into(), parameters.into()])
            }),
        )
        .register_feature(
            methods,
            FnFeature::new(&["MethodReturnType"], |input| {
                let function = function_of(input)?;
                let return_type = function.return_type.as_deref().unwrap_or_default();
                Ok(vec![input.cap(return_type, "returnType").into()])
            }),
        )
        .register_feature(
            methods,
            FnFeature::new(&["IsPrivateMethod", "IsAbstractMethod"], |input| {
                let function = function_of(input)?;
                Ok(vec![function.is_private.into(), function.is_abstract.into()])
            }),
        )
        .register_feature(
            methods,
            FnFeature::new(&["HasDocumentation"], |input| {
                Ok(vec![function_of(input)?.has_doc.into()])
            }),
        )
        .register_feature(
            methods,
            FnFeature::new(&["ContainsAuthentication"], |input| {
                Ok(vec![function_of(input)?.contains_authentication.into()])
            }),
        )
        .register_feature(
            methods,
            FnFeature::new(&["MethodBodyLength"], |input| {
                Ok(vec![function_of(input)?.body_length.into()])
            }),
        )
        .register_feature(
            methods,
            FnFeature::new(&["InternalMethodCalls", "ExternalMethodCalls"], |input| {
                let function = function_of(input)?;
                Ok(vec![
                    FeatureValue::List(function.internal_calls.clone()),
                    FeatureValue::List(function.external_calls.clone()),
                ])
            }),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{build, resolve};
    use crate::features::ProviderSettings;
    use crate::model::{
        CallSite, ClassConstruct, Construct, FunctionConstruct, FunctionType, ParsedModule,
        ReferenceHint, Span, TypedName,
    };
    use crate::views::{select, ViewContext};
    use crate::vocab::Vocabulary;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_method_call_edges() {
        let class_span = Span::new((0, 0), (12, 1));
        let ctor_span = Span::new((3, 4), (5, 5));
        let add_span = Span::new((7, 4), (9, 5));
        let mut module = ParsedModule::new("Adder.ts");
        module.constructs = vec![
            Construct::Class(ClassConstruct {
                span: class_span,
                name: Some("Adder".into()),
                ..Default::default()
            }),
            Construct::Function(FunctionConstruct {
                span: ctor_span,
                function_type: FunctionType::Constructor,
                parameters: vec![TypedName::new("base", "number")],
                enclosing_class: Some(class_span),
                ..Default::default()
            }),
            Construct::Function(FunctionConstruct {
                span: add_span,
                name: Some("add".into()),
                function_type: FunctionType::Method,
                parameters: vec![TypedName::new("a", "number")],
                enclosing_class: Some(class_span),
                ..Default::default()
            }),
            Construct::Function(FunctionConstruct {
                span: Span::new((14, 0), (18, 1)),
                name: Some("myMethod".into()),
                function_type: FunctionType::FunctionDeclaration,
                parameters: vec![TypedName::new("x", "number")],
                return_type: Some("number".into()),
                calls: vec![
                    CallSite {
                        span: Span::new((15, 14), (15, 27)),
                        callee: "Adder".into(),
                        reference: Some(ReferenceHint::Construct(ctor_span)),
                    },
                    CallSite {
                        span: Span::new((16, 11), (16, 23)),
                        callee: "adder.add".into(),
                        reference: Some(ReferenceHint::Construct(add_span)),
                    },
                    CallSite {
                        span: Span::new((17, 4), (17, 20)),
                        callee: "console.log".into(),
                        reference: None,
                    },
                ],
                ..Default::default()
            }),
        ];
        let module = resolve(build(module), &Vocabulary::default());
        let vocab = Vocabulary::default();
        let cx = ViewContext::new(&module, &vocab);
        let selection = select(&module.entities()[3], cx, &[ViewGroup::Method]);

        let mut registry = Registry::new();
        register(&mut registry);
        let (features, diagnostics) =
            registry.dispatch(&selection.views[0], cx, &ProviderSettings::default());
        assert!(diagnostics.is_empty());
        assert_eq!(
            features.get("InternalMethodCalls"),
            Some(&FeatureValue::List(vec![
                "Adder.ts+3+4+5+5".to_string(),
                "Adder.ts+7+4+9+5".to_string(),
            ]))
        );
        assert_eq!(
            features.get("ExternalMethodCalls"),
            Some(&FeatureValue::List(vec!["console.log".to_string()]))
        );
        assert_eq!(features.get("MethodReturnType"), Some(&FeatureValue::from("number")));
        assert_eq!(features.get("MethodType"), Some(&FeatureValue::from("FunctionDeclaration")));
    }
}
