//! Flow edges: `handles`, `persists`, `transforms`, `consumes`/`produces`
//! and `calls`/`dispatches`.

use rayon::prelude::*;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::Snapshot;
use crate::core::schema::{ComponentKind, Edge, EdgeLabel, TransportProtocol};
use crate::error::Result;

/// Queue-style invocation markers
const DISPATCH_MARKERS: &str = r"\.(?:delay|apply_async|send_task|enqueue|perform_async|perform_later|dispatch|publish|emit|add_job)\s*\(|\b(?:queue|producer|publisher|broker|bus)\.\w+\s*\(|^\s*go\s+[\w.]+\s*\(";

/// Producer calls that hand a message to a broker topic
const PUBLISH_MARKERS: &str = r"\.(?:send|produce|sendToQueue|basic_publish|send_message|sendMessage|add)\s*\(";

pub struct FlowRules {
    dispatch: Regex,
    publish: Regex,
}

impl FlowRules {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dispatch: Regex::new(DISPATCH_MARKERS)?,
            publish: Regex::new(PUBLISH_MARKERS)?,
        })
    }

    /// `calls` and `dispatches` from services and transports to services,
    /// then `dispatches` to message-queue transports whose topic is published
    pub(crate) fn invocations(&self, snapshot: &Snapshot) -> Vec<Edge> {
        // invocation spellings of every eligible service: `Name` and `name`
        let mut spellings: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, component) in snapshot.components.iter().enumerate() {
            if component.kind != ComponentKind::Service || snapshot.named(&component.name).is_empty() {
                continue;
            }
            spellings.entry(component.name.clone()).or_default().push(idx);
            let camel = lower_camel(&component.name);
            if camel != component.name {
                spellings.entry(camel).or_default().push(idx);
            }
        }

        let topics: Vec<(usize, String)> = snapshot
            .components
            .iter()
            .enumerate()
            .filter(|(_, c)| c.transport_protocol == Some(TransportProtocol::Mq))
            .filter_map(|(idx, c)| c.metadata.get("topic").map(|t| (idx, t.clone())))
            .collect();

        let sources: Vec<usize> = snapshot
            .components
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c.kind, ComponentKind::Service | ComponentKind::Transport))
            .map(|(idx, _)| idx)
            .collect();

        let service_edges: Vec<Vec<Edge>> = sources
            .par_iter()
            .map(|&from| self.service_invocations(snapshot, from, &spellings))
            .collect();
        let queue_edges: Vec<Vec<Edge>> = sources
            .par_iter()
            .map(|&from| self.topic_dispatches(snapshot, from, &topics))
            .collect();

        service_edges
            .into_iter()
            .flatten()
            .chain(queue_edges.into_iter().flatten())
            .collect()
    }

    fn service_invocations(
        &self,
        snapshot: &Snapshot,
        from: usize,
        spellings: &HashMap<String, Vec<usize>>,
    ) -> Vec<Edge> {
        let body = &snapshot.bodies[from];

        // target -> (called directly, dispatched)
        let mut found: BTreeMap<usize, (bool, bool)> = BTreeMap::new();
        for (spelling, targets) in spellings {
            if !body.has_token(spelling) {
                continue;
            }
            let targets: Vec<usize> = targets.iter().copied().filter(|&t| t != from).collect();
            if targets.is_empty() {
                continue;
            }
            for line in body.lines().filter(|line| invokes(line, spelling)) {
                let dispatched = self.dispatch.is_match(line);
                for &to in &targets {
                    let entry = found.entry(to).or_default();
                    if dispatched {
                        entry.1 = true;
                    } else {
                        entry.0 = true;
                    }
                }
            }
        }

        let mut edges = Vec::new();
        for (to, (called, dispatched)) in found {
            if called {
                edges.push(snapshot.edge(from, to, EdgeLabel::Calls));
            }
            if dispatched {
                edges.push(snapshot.edge(from, to, EdgeLabel::Dispatches));
            }
        }
        edges
    }

    fn topic_dispatches(&self, snapshot: &Snapshot, from: usize, topics: &[(usize, String)]) -> Vec<Edge> {
        let body = &snapshot.bodies[from];
        let mut targets = BTreeSet::new();
        for (to, topic) in topics {
            if *to == from {
                continue;
            }
            let published = body.lines().any(|line| {
                quotes(line, topic) && (self.dispatch.is_match(line) || self.publish.is_match(line))
            });
            if published {
                targets.insert(*to);
            }
        }
        targets
            .into_iter()
            .map(|to| snapshot.edge(from, to, EdgeLabel::Dispatches))
            .collect()
    }
}

/// `handles`: every service to every transport declared in the same file
pub(crate) fn handles(snapshot: &Snapshot) -> Vec<Edge> {
    let mut edges = Vec::new();
    for indices in snapshot.by_file.values() {
        let of_kind = |kind: ComponentKind| indices.iter().copied().filter(move |&i| snapshot.component(i).kind == kind);
        for service in of_kind(ComponentKind::Service) {
            for transport in of_kind(ComponentKind::Transport) {
                edges.push(snapshot.edge(service, transport, EdgeLabel::Handles));
            }
        }
    }
    edges
}

/// `persists`: transport to every model named in its body
pub(crate) fn persists(snapshot: &Snapshot) -> Vec<Edge> {
    body_to_models(snapshot, ComponentKind::Transport, EdgeLabel::Persists)
}

/// `transforms`: transform to every model named in its body
pub(crate) fn transforms(snapshot: &Snapshot) -> Vec<Edge> {
    body_to_models(snapshot, ComponentKind::Transform, EdgeLabel::Transforms)
}

fn body_to_models(snapshot: &Snapshot, kind: ComponentKind, label: EdgeLabel) -> Vec<Edge> {
    let per_component: Vec<Vec<Edge>> = (0..snapshot.components.len())
        .into_par_iter()
        .filter(|&from| snapshot.component(from).kind == kind)
        .map(|from| {
            let targets: BTreeSet<usize> = snapshot.bodies[from]
                .tokens()
                .flat_map(|token| snapshot.named(token).iter().copied())
                .filter(|&to| to != from && snapshot.component(to).kind == ComponentKind::Model)
                .collect();
            targets
                .into_iter()
                .map(|to| snapshot.edge(from, to, label))
                .collect()
        })
        .collect();

    per_component.into_iter().flatten().collect()
}

/// `consumes` (model to component) and `produces` (component to model)
/// for every payload type naming a model
pub(crate) fn payloads(snapshot: &Snapshot) -> Vec<Edge> {
    let mut edges = Vec::new();
    for (idx, component) in snapshot.components.iter().enumerate() {
        if !matches!(component.kind, ComponentKind::Transport | ComponentKind::Service) {
            continue;
        }
        for ty in component.consumes.iter().flatten() {
            for &model in snapshot.models_named(ty) {
                edges.push(snapshot.edge(model, idx, EdgeLabel::Consumes).with_payload(ty.as_str()));
            }
        }
        for ty in component.produces.iter().flatten() {
            for &model in snapshot.models_named(ty) {
                edges.push(snapshot.edge(idx, model, EdgeLabel::Produces).with_payload(ty.as_str()));
            }
        }
    }
    edges
}

/// `Name` to `name`; other spellings are returned unchanged
fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => first.to_ascii_lowercase().to_string() + chars.as_str(),
        _ => name.to_string(),
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Whether `name` is invoked on `line`: followed by `(`, or by a member
/// call such as `.run(`, `?.run(` or `::run(`
fn invokes(line: &str, name: &str) -> bool {
    let bytes = line.as_bytes();
    let mut from = 0;
    while let Some(pos) = line[from..].find(name) {
        let start = from + pos;
        let end = start + name.len();
        from = end;

        if start > 0 && is_ident_byte(bytes[start - 1]) {
            continue;
        }
        if end < bytes.len() && is_ident_byte(bytes[end]) {
            continue;
        }

        let rest = line[end..].trim_start();
        if rest.starts_with('(') {
            return true;
        }
        let member = rest
            .strip_prefix("?.")
            .or_else(|| rest.strip_prefix('.'))
            .or_else(|| rest.strip_prefix("::"));
        if let Some(member) = member {
            let ident_len = member.bytes().take_while(|&b| is_ident_byte(b)).count();
            if ident_len > 0 && member[ident_len..].trim_start().starts_with('(') {
                return true;
            }
        }
    }
    false
}

/// Whether `line` contains `topic` as a quoted string literal
fn quotes(line: &str, topic: &str) -> bool {
    ['"', '\'', '`'].iter().any(|q| line.contains(&format!("{q}{topic}{q}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RelationshipConfig;
    use crate::core::language::Language;
    use crate::core::relationships::tests::components_for;
    use crate::core::source::SourceFile;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn position(snapshot: &Snapshot, name: &str) -> usize {
        snapshot
            .components
            .iter()
            .position(|c| c.name == name)
            .unwrap_or_else(|| panic!("no component named {name}"))
    }

    #[test]
    fn test_invokes() {
        assert!(invokes("  billingService.charge(order)", "billingService"));
        assert!(invokes("send_email.delay(user.id)", "send_email"));
        assert!(invokes("this.mailer?.send(x)", "mailer"));
        assert!(invokes("Billing::charge(&order)", "Billing"));
        assert!(invokes("notify (user)", "notify"));
        assert!(!invokes("router.get('/x', listUsers)", "listUsers"));
        assert!(!invokes("const notifyAll = 1", "notify"));
        assert!(!invokes("import { billingService } from './billing'", "billingService"));
    }

    #[test]
    fn test_lower_camel_and_quotes() {
        assert_eq!(lower_camel("UserService"), "userService");
        assert_eq!(lower_camel("send_email"), "send_email");
        assert!(quotes("producer.send('orders', msg)", "orders"));
        assert!(!quotes("producer.send(orders, msg)", "orders"));
    }

    #[test]
    fn test_calls_and_dispatches() {
        let sources = vec![
            SourceFile::new(
                "app/tasks.py",
                Language::Python,
                indoc! {r#"
                    @shared_task
                    def send_receipt(order_id):
                        pass
                "#},
            ),
            SourceFile::new(
                "app/views.py",
                Language::Python,
                indoc! {r#"
                    class OrderResource(Resource):
                        def post(self):
                            audit_log(self)
                            send_receipt.delay(42)
                            return {}
                "#},
            ),
            SourceFile::new(
                "app/services/audit.py",
                Language::Python,
                "def audit_log(resource):\n    return resource\n",
            ),
        ];
        let components = components_for(&sources);
        let snapshot = Snapshot::new(&components, &sources, &RelationshipConfig::default());
        let edges = FlowRules::new().unwrap().invocations(&snapshot);

        let resource = position(&snapshot, "OrderResource");
        let task = position(&snapshot, "send_receipt");
        let audit = position(&snapshot, "audit_log");
        assert!(edges.contains(&snapshot.edge(resource, task, EdgeLabel::Dispatches)));
        assert!(!edges.contains(&snapshot.edge(resource, task, EdgeLabel::Calls)));
        assert!(edges.contains(&snapshot.edge(resource, audit, EdgeLabel::Calls)));
    }

    #[test]
    fn test_topic_publish_dispatches_to_consumer() {
        let sources = vec![
            SourceFile::new(
                "src/consumers/payments.ts",
                Language::TypeScript,
                indoc! {r#"
                    export async function start() {
                      await consumer.subscribe({ topic: 'payments', fromBeginning: true });
                    }
                "#},
            ),
            SourceFile::new(
                "src/routes/checkout.ts",
                Language::TypeScript,
                indoc! {r#"
                    router.post('/checkout', async (req, res) => {
                      await producer.send({ topic: 'payments', messages: [] });
                      res.sendStatus(202);
                    });
                "#},
            ),
        ];
        let components = components_for(&sources);
        let snapshot = Snapshot::new(&components, &sources, &RelationshipConfig::default());
        let edges = FlowRules::new().unwrap().invocations(&snapshot);

        let route = position(&snapshot, "POST /checkout");
        let consumer = position(&snapshot, "mq:payments");
        assert_eq!(edges, vec![snapshot.edge(route, consumer, EdgeLabel::Dispatches)]);
    }

    #[test]
    fn test_handles_persists_and_payloads() {
        let sources = vec![
            SourceFile::new(
                "src/models/user.ts",
                Language::TypeScript,
                "export interface User {\n  id: string;\n}\n\nexport interface CreateUser {\n  name: string;\n}\n",
            ),
            SourceFile::new(
                "src/users.controller.ts",
                Language::TypeScript,
                indoc! {r#"
                    @Controller('users')
                    export class UsersController {
                      @Post()
                      create(@Body() dto: CreateUser): Promise<User> {
                        return this.repo.save(User.from(dto));
                      }
                    }
                "#},
            ),
        ];
        let components = components_for(&sources);
        let snapshot = Snapshot::new(&components, &sources, &RelationshipConfig::default());

        let controller = position(&snapshot, "UsersController");
        let route = position(&snapshot, "POST /users");
        let user = position(&snapshot, "User");
        let create_user = position(&snapshot, "CreateUser");

        assert_eq!(handles(&snapshot), vec![snapshot.edge(controller, route, EdgeLabel::Handles)]);
        assert!(persists(&snapshot).contains(&snapshot.edge(route, user, EdgeLabel::Persists)));

        let payloads = payloads(&snapshot);
        assert!(payloads.contains(
            &snapshot.edge(create_user, route, EdgeLabel::Consumes).with_payload("CreateUser")
        ));
        assert!(payloads.contains(&snapshot.edge(route, user, EdgeLabel::Produces).with_payload("User")));
    }

    #[test]
    fn test_char_literal_braces_stay_inside_transform() {
        let sources = vec![SourceFile::new(
            "src/token.rs",
            Language::Rust,
            indoc! {r#"
                pub struct Token {
                    open: char,
                }

                pub fn to_token(s: &str) -> Token {
                    let open = '{';
                    Token { open }
                }

                pub struct After {
                    x: u8,
                }
            "#},
        )];
        let components = components_for(&sources);
        let snapshot = Snapshot::new(&components, &sources, &RelationshipConfig::default());

        let to_token = position(&snapshot, "to_token");
        let token = position(&snapshot, "Token");
        assert_eq!(snapshot.component(to_token).source.line_end, Some(8));
        assert_eq!(transforms(&snapshot), vec![snapshot.edge(to_token, token, EdgeLabel::Transforms)]);
    }
}
