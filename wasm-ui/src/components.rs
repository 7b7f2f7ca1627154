//! Static content shown once the gate opens.

use portfolio_rs::Connectivity;
use yew::prelude::*;

/// A content section: anchor id, heading and body lines.
#[derive(Clone, PartialEq)]
pub struct Section {
    pub id: &'static str,
    pub title: &'static str,
    pub lines: &'static [&'static str],
}

const SECTIONS: &[Section] = &[
    Section {
        id: "about",
        title: "About",
        lines: &["Software engineer building reliable systems and friendly interfaces."],
    },
    Section {
        id: "skills",
        title: "Skills",
        lines: &["Rust", "TypeScript", "WebAssembly", "PostgreSQL", "Cloud infrastructure"],
    },
    Section {
        id: "projects",
        title: "Projects",
        lines: &[
            "Portfolio site: intro loader and content gate in Rust and Yew",
            "Realtime dashboard for service health",
        ],
    },
    Section {
        id: "experience",
        title: "Experience",
        lines: &["Backend engineer", "Full-stack developer"],
    },
    Section {
        id: "blog",
        title: "Blog",
        lines: &["Notes on state machines in the browser"],
    },
    Section {
        id: "contact",
        title: "Contact",
        lines: &["hello@example.com"],
    },
];

#[derive(Properties, PartialEq)]
pub struct ConnectivityBadgeProps {
    pub connectivity: Connectivity,
}

fn badge(connectivity: Connectivity) -> (&'static str, &'static str) {
    match connectivity {
        Connectivity::Online => ("badge online", "Connected"),
        Connectivity::Offline => ("badge offline", "No Internet Connection"),
    }
}

/// Online/offline indicator.
#[function_component(ConnectivityBadge)]
pub fn connectivity_badge(props: &ConnectivityBadgeProps) -> Html {
    let (class, text) = badge(props.connectivity);
    html! {
        <span class={class}>{ text }</span>
    }
}

#[derive(Properties, PartialEq)]
pub struct ContentTreeProps {
    pub connectivity: Connectivity,
}

/// Navbar, sections and footer.
#[function_component(ContentTree)]
pub fn content_tree(props: &ContentTreeProps) -> Html {
    html! {
        <div class="app">
            <nav class="navbar">
                <a class="brand" href="#">{ "Portfolio" }</a>
                <ul class="nav-links">
                    { for SECTIONS.iter().map(|s| html! {
                        <li><a href={format!("#{}", s.id)}>{ s.title }</a></li>
                    })}
                </ul>
                <ConnectivityBadge connectivity={props.connectivity} />
            </nav>

            <main class="main">
                <section class="hero">
                    <h1>{ "Hi, welcome to my portfolio" }</h1>
                </section>
                { for SECTIONS.iter().map(|s| html! {
                    <section id={s.id} class="section">
                        <h2>{ s.title }</h2>
                        <ul>
                            { for s.lines.iter().map(|line| html! { <li>{ *line }</li> }) }
                        </ul>
                    </section>
                })}
            </main>

            <footer class="footer">
                <span>{ "MIT License" }</span>
            </footer>
        </div>
    }
}
