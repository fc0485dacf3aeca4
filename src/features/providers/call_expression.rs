//! Call-expression features of the api group.

use crate::entity::{ArgumentInfo, CallLikeEntity, ConstructKind};
use crate::features::{FeatureValue, FnFeature, ProviderInput, Registry, Target};
use crate::views::ViewGroup;
use crate::vocab::is_route_like;

use super::{api_of, call_of};

fn is_method_invocation(input: &ProviderInput<'_>) -> bool {
    input.call().is_some_and(|call| call.is_property_access)
}

fn arg_texts<'a>(call: &'a CallLikeEntity, f: impl Fn(&'a ArgumentInfo) -> String) -> FeatureValue {
    FeatureValue::List(call.arguments.iter().map(f).collect())
}

pub fn register(registry: &mut Registry) {
    let calls = Target::group(ViewGroup::Api).construct(ConstructKind::CallExpression);
    registry
        .register_feature(
            calls,
            FnFeature::new(&["CallExpressionFullName", "CallExpressionFuncName"], |input| {
                let call = call_of(input)?;
                Ok(vec![
                    input.cap(&call.full_name(), "callExpressionFullName").into(),
                    input.cap(&call.func_name(), "callExpressionFuncName").into(),
                ])
            }),
        )
        .register_feature(
            calls,
            FnFeature::new(&["CallExpressionTargetType"], |input| {
                let call = call_of(input)?;
                Ok(vec![input.cap(&call.target_type, "callExpressionTargetType").into()])
            }),
        )
        .register_feature(
            calls,
            FnFeature::new(&["CallExpressionIsMethodInvocation"], |input| {
                let call = call_of(input)?;
                Ok(vec![(call.is_property_access && call.siblings.is_some()).into()])
            }),
        )
        .register_feature(
            calls,
            FnFeature::new(&["CallExpressionMethodOwnerText"], |input| {
                let owner = call_of(input)?.owner_text.as_deref().unwrap_or_default();
                Ok(vec![input.cap(owner, "methodInvocationOwnerText").into()])
            })
            .relevant_when(is_method_invocation),
        )
        .register_feature(
            calls,
            FnFeature::new(&["CallExpressionMethodOwnerType"], |input| {
                let owner = call_of(input)?.owner_type.as_deref().unwrap_or("any");
                Ok(vec![input.cap(owner, "methodInvocationOwnerType").into()])
            })
            .relevant_when(is_method_invocation),
        )
        .register_feature(
            calls,
            FnFeature::new(
                &[
                    "CallExpressionSiblingHttpMethodsCount",
                    "CallExpressionSiblingAppFxMethodsCount",
                    "CallExpressionSiblingOtherMethodsCount",
                ],
                |input| {
                    let siblings = call_of(input)?.siblings.unwrap_or_default();
                    Ok(vec![
                        siblings.http_methods.into(),
                        siblings.app_framework_methods.into(),
                        siblings.other_methods.into(),
                    ])
                },
            )
            .relevant_when(is_method_invocation),
        )
        .register_feature(
            calls,
            FnFeature::new(&["CallExpressionNumArgs"], |input| {
                Ok(vec![call_of(input)?.arguments.len().into()])
            }),
        )
        .register_feature(
            calls,
            FnFeature::new(&["CallExpressionArgsTypescriptKind"], |input| {
                let call = call_of(input)?;
                Ok(vec![arg_texts(call, |arg| arg.syntax.as_str().to_string())])
            }),
        )
        .register_feature(
            calls,
            FnFeature::new(&["CallExpressionArgsValues"], |input| {
                let call = call_of(input)?;
                Ok(vec![arg_texts(call, |arg| {
                    input.cap(arg.literal.as_deref().unwrap_or_default(), "argValue")
                })])
            }),
        )
        .register_feature(
            calls,
            FnFeature::new(&["InternalReferencedMethods"], |input| {
                Ok(vec![call_of(input)?.internal_referenced_methods.clone().into()])
            }),
        )
        .register_feature(
            calls,
            FnFeature::new(&["ExternalReferencedMethods"], |input| {
                Ok(vec![call_of(input)?.external_referenced_methods.clone().into()])
            }),
        )
        .register_feature(
            calls,
            FnFeature::new(&["CallExpressionArgsTypes"], |input| {
                let call = call_of(input)?;
                Ok(vec![arg_texts(call, |arg| input.cap(&arg.type_name, "argType"))])
            }),
        )
        .register_feature(
            calls,
            FnFeature::new(&["CallExpressionArgsCallabilities"], |input| {
                let call = call_of(input)?;
                Ok(vec![arg_texts(call, |arg| arg.callability.as_str().to_string())])
            }),
        )
        .register_feature(
            calls,
            FnFeature::new(
                &[
                    "CallExpressionIsFirstArgStringLiteral",
                    "CallExpressionIsFirstArgStringLiteralRoute",
                ],
                |input| {
                    let first = api_of(input)?.first_arg_string().filter(|s| !s.is_empty());
                    Ok(vec![
                        first.is_some().into(),
                        first.is_some_and(is_route_like).into(),
                    ])
                },
            ),
        )
        .register_feature(
            calls,
            FnFeature::new(&["CallExpressionIsParenthesized"], |input| {
                Ok(vec![call_of(input)?.is_parenthesized.into()])
            }),
        )
        .register_feature(
            calls,
            FnFeature::new(&["CallExpressionIsDecorator"], |input| {
                Ok(vec![call_of(input)?.is_decorator.into()])
            }),
        )
        .register_feature(
            calls,
            FnFeature::new(
                &["CallExpressionStartsWithHttpMethod", "CallExpressionEndsWithHttpMethod"],
                |input| {
                    let func_name = call_of(input)?.func_name();
                    let vocab = input.cx.vocab;
                    Ok(vec![
                        vocab.starts_with_http_method(&func_name).into(),
                        vocab.ends_with_http_method(&func_name).into(),
                    ])
                },
            ),
        );

    let api = Target::group(ViewGroup::Api);
    registry.register_feature(
        api,
        FnFeature::new(&["SuspectedApiMethod", "SuspectedApiRoute"], |input| {
            let api = api_of(input)?;
            Ok(vec![
                api.suspected_method().unwrap_or_default().into(),
                input.cap(&api.suspected_route().unwrap_or_default(), "suspectedApiRoute").into(),
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
        Argument, CallConstruct, Callability, Construct, Import, ParsedModule, Span, SyntaxKind,
    };
    use crate::views::{select, ViewContext};
    use crate::vocab::Vocabulary;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> FeatureValue {
        FeatureValue::List(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_route_registration_features() {
        let mut module = ParsedModule::new("app.ts");
        module.imports = vec![Import::new("express")];
        module.constructs = vec![
            Construct::Call(CallConstruct {
                span: Span::new((4, 0), (6, 2)),
                target: "app.get".into(),
                target_type: "IRouterMatcher".into(),
                is_property_access: true,
                owner_text: Some("app".into()),
                owner_type: Some("Express".into()),
                method_name: Some("get".into()),
                arguments: vec![
                    Argument {
                        syntax: SyntaxKind::StringLiteral,
                        type_name: "string-literal".into(),
                        literal: Some("/users".into()),
                        callability: Callability::NonCallable,
                        ..Default::default()
                    },
                    Argument {
                        syntax: SyntaxKind::ArrowFunction,
                        type_name: "lambda".into(),
                        callability: Callability::Callable,
                        arities: vec![2],
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }),
            Construct::Call(CallConstruct {
                span: Span::new((8, 0), (8, 20)),
                target: "app.listen".into(),
                is_property_access: true,
                owner_text: Some("app".into()),
                method_name: Some("listen".into()),
                arguments: vec![Argument {
                    syntax: SyntaxKind::NumericLiteral,
                    literal: Some("3000".into()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
        ];
        let module = resolve(build(module), &Vocabulary::default());
        let vocab = Vocabulary::default();
        let cx = ViewContext::new(&module, &vocab);
        let selection = select(&module.entities()[0], cx, &[ViewGroup::Api]);

        let mut registry = Registry::new();
        register(&mut registry);
        let (features, diagnostics) =
            registry.dispatch(&selection.views[0], cx, &ProviderSettings::default());
        assert!(diagnostics.is_empty());

        let expect = |name: &str| features.get(name).cloned().unwrap();
        assert_eq!(expect("CallExpressionFullName"), FeatureValue::from("app.get"));
        assert_eq!(expect("CallExpressionFuncName"), FeatureValue::from("get"));
        assert_eq!(expect("CallExpressionIsMethodInvocation"), FeatureValue::from(true));
        assert_eq!(expect("CallExpressionMethodOwnerType"), FeatureValue::from("Express"));
        assert_eq!(expect("CallExpressionSiblingHttpMethodsCount"), FeatureValue::from(1usize));
        assert_eq!(expect("CallExpressionSiblingAppFxMethodsCount"), FeatureValue::from(1usize));
        assert_eq!(expect("CallExpressionSiblingOtherMethodsCount"), FeatureValue::from(0usize));
        assert_eq!(
            expect("CallExpressionArgsTypescriptKind"),
            strings(&["StringLiteral", "ArrowFunction"])
        );
        assert_eq!(expect("CallExpressionArgsValues"), strings(&["/users", ""]));
        assert_eq!(
            expect("CallExpressionArgsCallabilities"),
            strings(&["non_callable", "callable"])
        );
        assert_eq!(expect("CallExpressionIsFirstArgStringLiteralRoute"), FeatureValue::from(true));
        assert_eq!(expect("CallExpressionStartsWithHttpMethod"), FeatureValue::from(true));
        assert_eq!(expect("SuspectedApiMethod"), FeatureValue::from("GET"));
        assert_eq!(expect("SuspectedApiRoute"), FeatureValue::from("/users"));
    }

    #[test]
    fn test_plain_call_marks_owner_features_irrelevant() {
        let mut module = ParsedModule::new("a.ts");
        module.constructs = vec![Construct::Call(CallConstruct {
            span: Span::new((0, 0), (0, 12)),
            target: "doThing".into(),
            arguments: vec![Argument::default()],
            ..Default::default()
        })];
        let module = resolve(build(module), &Vocabulary::default());
        let vocab = Vocabulary::default();
        let cx = ViewContext::new(&module, &vocab);
        let selection = select(&module.entities()[0], cx, &[ViewGroup::Api]);

        let mut registry = Registry::new();
        register(&mut registry);
        let (features, _) =
            registry.dispatch(&selection.views[0], cx, &ProviderSettings::default());
        let irrelevant = FeatureValue::irrelevant();
        assert_eq!(features.get("CallExpressionMethodOwnerText"), Some(&irrelevant));
        assert_eq!(features.get("CallExpressionSiblingOtherMethodsCount"), Some(&irrelevant));
        assert_eq!(features.get("SuspectedApiRoute"), Some(&FeatureValue::from("")));
    }
}
