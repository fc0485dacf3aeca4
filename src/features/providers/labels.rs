//! API framework labels.
//!
//! Each label recognises one way of registering a route. They run on the
//! `CallExpression` view, except `HapiRoute`, which is true for every
//! `Hapi` view.

use crate::entity::ClassEntity;
use crate::features::{FnLabel, ProviderInput, Registry, Target};
use crate::model::SyntaxKind;
use crate::views::{Api, CallExpressionView, ViewGroup, ViewKind};

const API_LABEL: &str = "ApiLabel";

/// Imports that mark a module as a request-mocking setup, not a server.
const FALSE_POSITIVE_IMPORTS: &[&str] = &["msw", "miragejs"];
const KOA_MODULES: &[&str] = &["koa", "koa-router", "@koa/router"];
const EXPRESS_KEYWORDS: &[&str] = &["all", "del"];

fn view<'a>(input: &ProviderInput<'a>) -> Option<&'a CallExpressionView<'a>> {
    input.view.as_call_expression()
}

fn imports_mocking_library(input: &ProviderInput<'_>) -> bool {
    FALSE_POSITIVE_IMPORTS
        .iter()
        .any(|specifier| input.cx.module.has_import(specifier))
}

/// Every argument after the route (if one is expected) is callable with
/// `min..=max` parameters, and there is at least one.
fn has_handler_like_args(
    view: &CallExpressionView<'_>,
    min: usize,
    max: usize,
    route_first: bool,
) -> bool {
    let handlers = view.argument_types().get(usize::from(route_first)..).unwrap_or_default();
    !handlers.is_empty() && handlers.iter().all(|arg| arg.is_callable_with(min, max))
}

fn is_express(input: &ProviderInput<'_>, module_name: &str) -> bool {
    let Some(view) = view(input) else {
        return false;
    };
    let call = view.call();
    let func_name = call.func_name();
    let vocab = input.cx.vocab;
    let is_http = vocab.is_http_method(&func_name);
    let has_root = call.root_route_path.as_deref().is_some_and(|r| !r.is_empty());

    !imports_mocking_library(input)
        && input.cx.module.has_import(module_name)
        && ((is_http && call.has_minimum_arguments(2))
            || (is_http && has_root && call.has_minimum_arguments(1))
            || (EXPRESS_KEYWORDS.contains(&func_name.as_str()) && call.has_minimum_arguments(2)))
        && func_name != call.full_name()
        && !call.nested_in_route
}

fn is_koa(input: &ProviderInput<'_>) -> bool {
    let Some(view) = view(input) else {
        return false;
    };
    input.cx.vocab.is_http_method_ignore_case(&view.call().func_name())
        && KOA_MODULES.iter().any(|m| input.cx.module.has_import(m))
        && has_handler_like_args(view, 1, 2, true)
}

fn is_express_style_route(input: &ProviderInput<'_>) -> bool {
    let Some(view) = view(input) else {
        return false;
    };
    let has_root = view
        .call()
        .root_route_path
        .as_deref()
        .is_some_and(|r| !r.is_empty());

    !imports_mocking_library(input)
        && view.suspected_method().is_some()
        && view.suspected_route().is_some_and(|r| !r.is_empty())
        && has_handler_like_args(view, 2, 3, !has_root)
}

/// `@Get()`, `@Post('/path')` and friends.
fn is_decorator_defined_api(view: &CallExpressionView<'_>, input: &ProviderInput<'_>) -> bool {
    let call = view.call();
    let args_fit = call
        .arguments
        .first()
        .map_or(true, |arg| arg.syntax == SyntaxKind::StringLiteral);
    input.cx.vocab.is_http_method_ignore_case(&call.func_name()) && call.is_decorator && args_fit
}

fn is_routing_controller(input: &ProviderInput<'_>) -> bool {
    view(input).is_some_and(|view| {
        input.cx.module.has_import("routing-controllers") && is_decorator_defined_api(view, input)
    })
}

fn is_nestjs(input: &ProviderInput<'_>) -> bool {
    view(input).is_some_and(|view| {
        input.cx.module.has_import_with_prefix("@nestjs")
            && view.class_entity().is_some_and(|c: &ClassEntity| c.has_decorator("Controller"))
            && is_decorator_defined_api(view, input)
    })
}

fn is_serverjs(input: &ProviderInput<'_>) -> bool {
    view(input).is_some_and(|view| view.is_serverjs_route())
}

fn is_sfra(input: &ProviderInput<'_>) -> bool {
    view(input).is_some_and(|view| view.is_sfra_route())
}

pub fn register(registry: &mut Registry) {
    let calls = Target::group(ViewGroup::Api).view(ViewKind::CallExpression);
    registry
        .register_label(
            calls,
            FnLabel::new(API_LABEL, "Express", |input| is_express(input, "express")),
        )
        .register_label(
            calls,
            FnLabel::new(API_LABEL, "Express.IO", |input| is_express(input, "express.io")),
        )
        .register_label(calls, FnLabel::new(API_LABEL, "Koa", is_koa))
        .register_label(
            calls,
            FnLabel::new(API_LABEL, "ExpressStyleRouteDefinition", is_express_style_route),
        )
        .register_label(calls, FnLabel::new(API_LABEL, "RoutingController", is_routing_controller))
        .register_label(calls, FnLabel::new(API_LABEL, "NestJS", is_nestjs))
        .register_label(
            Target::group(ViewGroup::Api).view(ViewKind::Hapi),
            FnLabel::new(API_LABEL, "HapiRoute", |_| true),
        )
        .register_label(calls, FnLabel::new(API_LABEL, "ServerJS", is_serverjs))
        .register_label(calls, FnLabel::new(API_LABEL, "SFRA", is_sfra));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{build, resolve, ResolvedModule};
    use crate::features::{FeatureMap, ProviderSettings};
    use crate::model::{Argument, CallConstruct, Callability, Construct, Import, ParsedModule, Span};
    use crate::views::{select, ViewContext};
    use crate::vocab::Vocabulary;

    fn route(value: &str) -> Argument {
        Argument {
            syntax: SyntaxKind::StringLiteral,
            type_name: "string-literal".into(),
            literal: Some(value.into()),
            callability: Callability::NonCallable,
            ..Default::default()
        }
    }

    fn handler(arity: usize) -> Argument {
        Argument {
            syntax: SyntaxKind::ArrowFunction,
            type_name: "lambda".into(),
            callability: Callability::Callable,
            arities: vec![arity],
            ..Default::default()
        }
    }

    fn member_call(line: usize, target: &str, arguments: Vec<Argument>) -> Construct {
        let (owner, method) = target.rsplit_once('.').unwrap_or(("", target));
        Construct::Call(CallConstruct {
            span: Span::new((line, 0), (line, 40)),
            target: target.into(),
            is_property_access: !owner.is_empty(),
            owner_text: (!owner.is_empty()).then(|| owner.to_string()),
            method_name: (!owner.is_empty()).then(|| method.to_string()),
            arguments,
            ..Default::default()
        })
    }

    fn module(imports: &[&str], constructs: Vec<Construct>) -> ResolvedModule {
        let mut module = ParsedModule::new("routes.ts");
        module.imports = imports.iter().map(|i| Import::new(*i)).collect();
        module.constructs = constructs;
        resolve(build(module), &Vocabulary::default())
    }

    fn labels_of(module: &ResolvedModule, index: usize) -> FeatureMap {
        let vocab = Vocabulary::default();
        let cx = ViewContext::new(module, &vocab);
        let mut registry = Registry::new();
        register(&mut registry);
        let selection = select(&module.entities()[index], cx, &[ViewGroup::Api]);
        registry.dispatch(&selection.views[0], cx, &ProviderSettings::default()).0
    }

    fn true_labels(features: &FeatureMap) -> Vec<String> {
        features
            .labels()
            .filter(|(_, v)| *v)
            .map(|(n, _)| n.to_string())
            .collect()
    }

    #[test]
    fn test_express_route() {
        let m = module(
            &["express"],
            vec![member_call(1, "app.get", vec![route("/a"), handler(2)])],
        );
        assert_eq!(
            true_labels(&labels_of(&m, 0)),
            vec!["!ApiLabel!Express", "!ApiLabel!ExpressStyleRouteDefinition"]
        );
    }

    #[test]
    fn test_mocking_import_suppresses_express() {
        let m = module(
            &["express", "msw"],
            vec![member_call(1, "app.get", vec![route("/a"), handler(2)])],
        );
        assert!(true_labels(&labels_of(&m, 0)).is_empty());
    }

    #[test]
    fn test_koa_router() {
        let m = module(
            &["koa-router"],
            vec![member_call(1, "router.get", vec![route("/a"), handler(1)])],
        );
        assert_eq!(true_labels(&labels_of(&m, 0)), vec!["!ApiLabel!Koa"]);
    }

    #[test]
    fn test_serverjs_without_route() {
        let m = module(&["server"], vec![member_call(1, "del", vec![handler(1), handler(1)])]);
        let features = labels_of(&m, 0);
        assert_eq!(true_labels(&features), vec!["!ApiLabel!ServerJS"]);
    }

    #[test]
    fn test_hapi_label_names_are_stable() {
        let m = module(&["express"], vec![member_call(1, "app.use", vec![handler(3)])]);
        let features = labels_of(&m, 0);
        assert_eq!(features.labels().count(), 9);
        assert!(true_labels(&features).is_empty());
    }
}
