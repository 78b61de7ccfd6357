use serde::Serialize;
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Hero {
    pub badge: String,
    pub headline: String,
    pub tagline: String,
    pub primary_cta: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct Feature {
    pub title: String,
    pub description: String,
    pub badge: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct IntegrationTeaser {
    pub name: String,
    pub description: String,
    pub features: Vec<String>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
pub struct PricingPlan {
    pub name: String,
    pub price: String,
    pub period: Option<String>,
    pub description: String,
    pub features: Vec<String>,
    pub cta: String,
    pub popular: bool,
}

/// Everything shown to signed-out visitors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct MarketingPage {
    pub hero: Hero,
    pub features: Vec<Feature>,
    pub integrations: Vec<IntegrationTeaser>,
    pub pricing: Vec<PricingPlan>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

pub fn features() -> Vec<Feature> {
    [
        (
            "Unlimited File Uploads",
            "Upload files of any size without the 33MB limitation. Our intelligent chunking system maintains efficiency.",
            "No Limits",
        ),
        (
            "AI-Powered Chatbots",
            "Create intelligent chatbots trained on your knowledge base with advanced natural language understanding.",
            "Smart AI",
        ),
        (
            "Native Integrations",
            "Seamlessly connect with Slack, n8n, and Zapier for powerful workflow automation.",
            "Workflow Ready",
        ),
        (
            "Secure Authentication",
            "Google Sign-In and email authentication with enterprise-grade security.",
            "Secure",
        ),
        (
            "Advanced Analytics",
            "Track chatbot performance, user interactions, and knowledge base effectiveness.",
            "Insights",
        ),
        (
            "Customizable Design",
            "Brand your chatbots with custom colors, logos, and styling to match your brand.",
            "Branded",
        ),
        (
            "Multi-Format Support",
            "Support for PDF, DOC, TXT, CSV, and more file formats with intelligent text extraction.",
            "Versatile",
        ),
        (
            "Intelligent Search",
            "Advanced semantic search across your entire knowledge base for accurate responses.",
            "Semantic",
        ),
        (
            "API & Webhooks",
            "Robust API and webhook support for custom integrations and automation.",
            "Developer Ready",
        ),
    ]
    .into_iter()
    .map(|(title, description, badge)| Feature {
        title: title.to_string(),
        description: description.to_string(),
        badge: badge.to_string(),
    })
    .collect()
}

pub fn integration_teasers() -> Vec<IntegrationTeaser> {
    [
        (
            "Slack",
            "Deploy your AI chatbot directly to Slack channels for instant team access.",
            ["Direct channel deployment", "Slash commands", "Thread responses", "User permissions"],
        ),
        (
            "n8n",
            "Connect your chatbot to powerful workflow automation with n8n's visual editor.",
            ["Visual workflow builder", "Trigger automation", "Data transformation", "Multi-step flows"],
        ),
        (
            "Zapier",
            "Integrate with 5000+ apps through Zapier's extensive automation platform.",
            ["5000+ app connections", "Multi-step zaps", "Conditional logic", "Real-time triggers"],
        ),
    ]
    .into_iter()
    .map(|(name, description, features)| IntegrationTeaser {
        name: name.to_string(),
        description: description.to_string(),
        features: strings(&features),
        status: "Available".to_string(),
    })
    .collect()
}

pub fn pricing_plans() -> Vec<PricingPlan> {
    vec![
        PricingPlan {
            name: "Starter".to_string(),
            price: "Free".to_string(),
            period: None,
            description: "Perfect for trying out unlimited knowledge bases".to_string(),
            features: strings(&[
                "Up to 3 chatbots",
                "Unlimited file uploads",
                "Basic integrations",
                "Community support",
                "Standard AI models",
                "1,000 messages/month",
            ]),
            cta: "Get Started Free".to_string(),
            popular: false,
        },
        PricingPlan {
            name: "Professional".to_string(),
            price: "$29".to_string(),
            period: Some("/month".to_string()),
            description: "For teams building production chatbots".to_string(),
            features: strings(&[
                "Unlimited chatbots",
                "Unlimited file uploads",
                "All native integrations",
                "Priority support",
                "Advanced AI models",
                "50,000 messages/month",
                "Custom branding",
                "Analytics dashboard",
                "API access",
            ]),
            cta: "Start Free Trial".to_string(),
            popular: true,
        },
        PricingPlan {
            name: "Enterprise".to_string(),
            price: "Custom".to_string(),
            period: None,
            description: "For large organizations with specific needs".to_string(),
            features: strings(&[
                "Everything in Professional",
                "Unlimited messages",
                "Custom integrations",
                "Dedicated support",
                "SLA guarantees",
                "On-premise deployment",
                "Advanced security",
                "Custom AI training",
                "White-label solution",
            ]),
            cta: "Contact Sales".to_string(),
            popular: false,
        },
    ]
}

pub fn marketing_page() -> MarketingPage {
    MarketingPage {
        hero: Hero {
            badge: "Unlimited Knowledge Base".to_string(),
            headline: "Build AI chatbots with unlimited knowledge".to_string(),
            tagline: "Upload unlimited files, train powerful AI chatbots, and integrate seamlessly with Slack, n8n, and Zapier. No 33MB limits, no efficiency loss.".to_string(),
            primary_cta: "Get Started Free".to_string(),
        },
        features: features(),
        integrations: integration_teasers(),
        pricing: pricing_plans(),
    }
}
